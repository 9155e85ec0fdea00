//! Program generation, execution and instruction access

use tracing::{debug, warn};

use super::Link;
use crate::error::{Result, RobolinkError};
use crate::protocol::codec;
use crate::protocol::enums::{InstructionCall, InstructionType, MoveType, ProgramRunType};
use crate::protocol::item::Item;
use crate::protocol::types::{Mat, Pose};
use crate::protocol::Command;

/// Separator of program parameters on the wire
const PARAM_SEPARATOR: &str = "<br>";

/// Move data carried by a move instruction
#[derive(Debug, Clone, PartialEq)]
pub struct MoveInstruction {
    /// Joint or linear move
    pub move_type: MoveType,
    /// Whether the target is a joint target
    pub is_joint_target: bool,
    /// Target pose
    pub pose: Pose,
    /// Target joints
    pub joints: Vec<f64>,
}

/// One program instruction
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    /// Display name
    pub name: String,
    /// Raw instruction type code
    pub instruction_type: i32,
    /// Move data, present for move instructions
    pub motion: Option<MoveInstruction>,
}

impl Instruction {
    /// Decoded instruction type
    pub fn kind(&self) -> Option<InstructionType> {
        InstructionType::from_code(self.instruction_type)
    }

    /// Whether this is a joint or linear move
    pub fn is_move(&self) -> bool {
        self.instruction_type == InstructionType::Move.code()
    }
}

/// Joint sequence of a program
#[derive(Debug, Clone, PartialEq)]
pub struct ProgramJoints {
    /// One column per step; `None` when the list was saved to a file
    pub joints: Option<Mat>,
    /// Result code; negative when the program has problems
    pub code: i32,
    /// Human readable result
    pub message: String,
}

impl Link {
    /// Generate the robot program file
    ///
    /// Returns whether generation succeeded and the generation log.
    pub fn make_program(&mut self, program: &Item, path: &str) -> Result<(bool, String)> {
        let (status, log) = self.call(
            Command::MakeProgram,
            |r| r.item(program).line(path),
            |r| Ok((r.int()?, r.line()?)),
        )?;
        let ok = status > 1;
        if !ok {
            warn!(status, log = %log, "Program generation failed");
        }
        Ok((ok, log))
    }

    /// Run a program on the simulator or the real robot
    pub fn set_run_type(&mut self, program: &Item, run_type: ProgramRunType) -> Result<()> {
        self.call_unit(Command::SetRunType, |r| r.item(program).int(run_type.code()))
    }

    /// Start a program without waiting
    ///
    /// Returns the number of problems found in it (0 = ready to run).
    pub fn run_program(&mut self, program: &Item) -> Result<i32> {
        debug!(program = program.id(), "Running program");
        self.call(Command::RunProgram, |r| r.item(program), |r| r.int())
    }

    /// Start a program with parameters
    pub fn run_program_with_params<S: AsRef<str>>(
        &mut self,
        program: &Item,
        params: &[S],
    ) -> Result<i32> {
        let joined = params
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<_>>()
            .join(PARAM_SEPARATOR);
        self.call(
            Command::RunProgramWithParams,
            |r| r.item(program).line(&joined),
            |r| r.int(),
        )
    }

    /// Append custom code to a program
    pub fn add_custom_code(
        &mut self,
        program: &Item,
        code: &str,
        call: InstructionCall,
    ) -> Result<i32> {
        let code = codec::escape_line_breaks(code);
        self.call(
            Command::AddCustomCode,
            |r| r.item(program).line(&code).int(call.code()),
            |r| r.int(),
        )
    }

    /// Append a pause; `None` pauses until the user resumes
    pub fn pause(&mut self, program: &Item, time_ms: Option<f64>) -> Result<()> {
        let time_ms = time_ms.unwrap_or(-1.0);
        self.call_unit(Command::Pause, |r| r.item(program).int_rounded(time_ms * 1000.0))
    }

    /// Append a digital output change
    pub fn set_digital_output(&mut self, program: &Item, io_var: &str, value: &str) -> Result<()> {
        self.call_unit(Command::SetDigitalOutput, |r| r.item(program).line(io_var).line(value))
    }

    /// Append a wait on a digital input; `None` waits forever
    pub fn wait_digital_input(
        &mut self,
        program: &Item,
        io_var: &str,
        value: &str,
        timeout_ms: Option<f64>,
    ) -> Result<()> {
        let timeout_ms = timeout_ms.unwrap_or(-1.0);
        self.call_unit(Command::WaitDigitalInput, |r| {
            r.item(program)
                .line(io_var)
                .line(value)
                .int_rounded(timeout_ms * 1000.0)
        })
    }

    /// Append a joint move to a target item
    pub fn add_move_j(&mut self, program: &Item, target: &Item) -> Result<()> {
        self.add_move(program, target, MoveType::Joint)
    }

    /// Append a linear move to a target item
    pub fn add_move_l(&mut self, program: &Item, target: &Item) -> Result<()> {
        self.add_move(program, target, MoveType::Linear)
    }

    fn add_move(&mut self, program: &Item, target: &Item, move_type: MoveType) -> Result<()> {
        self.call_unit(Command::AddMoveInstruction, |r| {
            r.item(target).item(program).int(move_type.code())
        })
    }

    /// Show or hide the instruction list of a program in the tree
    pub fn show_instructions(&mut self, program: &Item, show: bool) -> Result<()> {
        self.call_unit(Command::ShowInstructions, |r| r.item(program).flag(show))
    }

    /// Number of instructions of a program
    pub fn instruction_count(&mut self, program: &Item) -> Result<i32> {
        self.call(Command::InstructionCount, |r| r.item(program), |r| r.int())
    }

    /// Read one instruction; `None` reads the last one
    pub fn instruction(&mut self, program: &Item, id: Option<i32>) -> Result<Instruction> {
        let id = id.unwrap_or(-1);
        self.call(
            Command::GetInstruction,
            |r| r.item(program).int(id),
            |r| {
                let name = r.line()?;
                let instruction_type = r.int()?;
                let motion = if instruction_type == InstructionType::Move.code() {
                    let move_type = r.int()?;
                    let is_joint_target = r.int()? > 0;
                    let pose = r.pose()?;
                    let joints = r.array()?;
                    Some(MoveInstruction {
                        move_type: MoveType::from_code(move_type).unwrap_or(MoveType::Invalid),
                        is_joint_target,
                        pose,
                        joints,
                    })
                } else {
                    None
                };
                Ok(Instruction {
                    name,
                    instruction_type,
                    motion,
                })
            },
        )
    }

    /// Overwrite one instruction
    ///
    /// A move instruction must carry its move data.
    pub fn set_instruction(
        &mut self,
        program: &Item,
        id: i32,
        instruction: &Instruction,
    ) -> Result<()> {
        let motion = match (instruction.is_move(), &instruction.motion) {
            (true, None) => {
                return Err(RobolinkError::InvalidArgument(format!(
                    "move instruction '{}' needs a pose and joints",
                    instruction.name
                )))
            }
            (true, Some(motion)) => Some(motion),
            (false, _) => None,
        };
        self.call_unit(Command::SetInstruction, |r| {
            let r = r
                .item(program)
                .int(id)
                .line(&instruction.name)
                .int(instruction.instruction_type);
            match motion {
                Some(m) => r
                    .int(m.move_type.code())
                    .flag(m.is_joint_target)
                    .pose(&m.pose)
                    .array(&m.joints),
                None => r,
            }
        })
    }

    /// Every instruction of a program as a matrix, with the error count
    pub fn instruction_list(&mut self, program: &Item) -> Result<(Mat, i32)> {
        self.call(
            Command::InstructionList,
            |r| r.item(program),
            |r| Ok((r.matrix()?, r.int()?)),
        )
    }

    /// Joint sequence of a program at the given resolution
    ///
    /// With `save_to`, the list is written to that file by RoboDK and not
    /// returned.
    pub fn joint_list(
        &mut self,
        program: &Item,
        step_mm: f64,
        step_deg: f64,
        save_to: Option<&str>,
    ) -> Result<ProgramJoints> {
        let path = save_to.unwrap_or("");
        self.call(
            Command::JointList,
            |r| r.item(program).array(&[step_mm, step_deg]).line(path),
            |r| {
                let joints = if path.is_empty() {
                    Some(r.matrix()?)
                } else {
                    None
                };
                Ok(ProgramJoints {
                    joints,
                    code: r.int()?,
                    message: r.line()?,
                })
            },
        )
    }

    /// Run a program and wait until it finishes
    pub fn run_program_blocking(&mut self, program: &Item) -> Result<i32> {
        let problems = self.run_program(program)?;
        self.wait_finished(program)?;
        Ok(problems)
    }
}
