//! Integer enumerations shared with the RoboDK server
//!
//! Every enumeration travels as a big-endian int32. `code()` gives the wire
//! value and `from_code()` maps a received value back, returning `None` for
//! values this client does not know.

macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $value:literal, )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $( $(#[$vmeta])* $variant, )+
        }

        impl $name {
            /// Wire value
            pub fn code(self) -> i32 {
                match self {
                    $( $name::$variant => $value, )+
                }
            }

            /// Decode a wire value
            pub fn from_code(code: i32) -> Option<Self> {
                match code {
                    $( $value => Some($name::$variant), )+
                    _ => None,
                }
            }
        }
    };
}

wire_enum! {
    /// Station tree item types
    pub enum ItemType {
        /// Station (root of the tree)
        Station = 1,
        /// Robot
        Robot = 2,
        /// Reference frame
        Frame = 3,
        /// Tool (TCP)
        Tool = 4,
        /// Object / geometry
        Object = 5,
        /// Target
        Target = 6,
        /// Program
        Program = 8,
        /// Program instruction
        Instruction = 9,
        /// Python script
        ProgramPython = 10,
        /// Machining / curve / point following project
        Machining = 11,
        /// Ballbar validation project
        BallbarValidation = 12,
        /// Robot calibration project
        CalibProject = 13,
        /// ISO 9283 validation project
        ValidIso9283 = 14,
    }
}

wire_enum! {
    /// Program instruction types
    pub enum InstructionType {
        /// Invalid instruction
        Invalid = -1,
        /// Joint or linear move
        Move = 0,
        /// Circular move
        MoveC = 1,
        /// Speed change
        ChangeSpeed = 2,
        /// Reference frame change
        ChangeFrame = 3,
        /// Tool change
        ChangeTool = 4,
        /// Robot change
        ChangeRobot = 5,
        /// Pause
        Pause = 6,
        /// Event
        Event = 7,
        /// Raw code
        Code = 8,
        /// Print message
        Print = 9,
    }
}

wire_enum! {
    /// Motion types
    pub enum MoveType {
        /// Invalid move
        Invalid = -1,
        /// Joint move
        Joint = 1,
        /// Linear move
        Linear = 2,
        /// Circular move
        Circular = 3,
    }
}

wire_enum! {
    /// Script execution modes
    pub enum RunMode {
        /// Simulate the motion (default)
        Simulate = 1,
        /// Quick check that the path is feasible
        QuickValidate = 2,
        /// Generate the robot program
        MakeRobotProg = 3,
        /// Generate and upload the robot program
        MakeRobotProgAndUpload = 4,
        /// Generate the program and start it on the robot
        MakeRobotProgAndStart = 5,
        /// Drive the real robot from the PC
        RunRobot = 6,
    }
}

wire_enum! {
    /// Where a program runs
    pub enum ProgramRunType {
        /// Simulator only
        Simulator = 1,
        /// Real robot
        Robot = 2,
    }
}

wire_enum! {
    /// Connection state of a real robot driver
    pub enum RobotComStatus {
        /// Communication problems
        Problems = -3,
        /// Disconnected
        Disconnected = -2,
        /// Not connected
        NotConnected = -1,
        /// Ready to move
        Ready = 0,
        /// Working
        Working = 1,
        /// Waiting
        Waiting = 2,
        /// Unknown state
        Unknown = -1000,
    }
}

wire_enum! {
    /// TCP calibration algorithms
    pub enum CalibrateTcp {
        /// Calibrate by touching a point
        ByPoint = 0,
        /// Calibrate by touching a plane
        ByPlane = 1,
    }
}

wire_enum! {
    /// Curve and point projection types
    pub enum Projection {
        /// No projection
        None = 0,
        /// Closest point on the surface
        Closest = 1,
        /// Along the point normal
        AlongNormal = 2,
        /// Along the normal, recalculating the normal on the surface
        AlongNormalRecalc = 3,
    }
}

wire_enum! {
    /// Euler angle conventions for pose lists
    pub enum EulerType {
        /// Generic RX, RY', RZ''
        RxRypRzpp = 0,
        /// ABB RobotStudio
        RzRypRxpp = 1,
        /// Kawasaki, Adept, Staubli
        RzRypRzpp = 2,
        /// CATIA, SolidWorks
        RzRxpRzpp = 3,
        /// Fanuc, Kuka, Motoman, Nachi
        RxRyRz = 4,
        /// CRS
        RzRyRx = 5,
        /// ABB Rapid quaternion
        Quaternion = 6,
    }
}

wire_enum! {
    /// RoboDK main window states
    pub enum WindowState {
        /// Hidden
        Hidden = -1,
        /// Shown
        Show = 0,
        /// Minimized
        Minimized = 1,
        /// Normal
        Normal = 2,
        /// Maximized
        Maximized = 3,
        /// Full screen
        Fullscreen = 4,
        /// Cinema mode
        Cinema = 5,
        /// Full screen cinema mode
        FullscreenCinema = 6,
    }
}

wire_enum! {
    /// How custom code is inserted in a program
    pub enum InstructionCall {
        /// Call a program
        CallProgram = 0,
        /// Insert raw code
        InsertCode = 1,
        /// Start a thread
        StartThread = 2,
        /// Comment
        Comment = 3,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_type_codes() {
        assert_eq!(ItemType::Robot.code(), 2);
        assert_eq!(ItemType::Program.code(), 8);
        assert_eq!(ItemType::from_code(6), Some(ItemType::Target));
        // 7 is not assigned
        assert_eq!(ItemType::from_code(7), None);
    }

    #[test]
    fn test_negative_codes() {
        assert_eq!(WindowState::from_code(-1), Some(WindowState::Hidden));
        assert_eq!(RobotComStatus::from_code(-1000), Some(RobotComStatus::Unknown));
        assert_eq!(InstructionType::Invalid.code(), -1);
    }
}
