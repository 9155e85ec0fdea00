//! Command verbs of the RoboDK remote API
//!
//! A command is identified by an ASCII token sent as the first line of a
//! request. Its argument and result shapes are fixed by the server and are
//! encoded by the matching operation on [`Link`](crate::link::Link).

use std::fmt;

macro_rules! commands {
    (
        $( $(#[$vmeta:meta])* $variant:ident => $token:literal, )+
    ) => {
        /// Every verb the client can send
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Command {
            $( $(#[$vmeta])* $variant, )+
        }

        impl Command {
            /// All verbs, in declaration order
            pub const ALL: &'static [Command] = &[ $( Command::$variant, )+ ];

            /// Wire token
            pub fn as_str(self) -> &'static str {
                match self {
                    $( Command::$variant => $token, )+
                }
            }

            /// Look up a verb by its wire token
            pub fn from_token(token: &str) -> Option<Self> {
                match token {
                    $( $token => Some(Command::$variant), )+
                    _ => None,
                }
            }
        }
    };
}

commands! {
    // Session
    /// Handshake start token
    Start => "CMD_START",

    // Station
    GetItem => "G_Item",
    GetItemOfType => "G_Item2",
    ListItems => "G_List_Items",
    ListItemsOfType => "G_List_Items_Type",
    ListItemHandles => "G_List_Items_ptr",
    ListItemHandlesOfType => "G_List_Items_Type_ptr",
    /// Interactive: runs under the extended timeout
    PickItem => "PickItem",
    ShowWindow => "RAISE",
    HideWindow => "HIDE",
    SetWindowState => "S_WindowState",
    /// Interactive when shown as a popup
    ShowMessage => "ShowMessage",
    ShowMessageStatus => "ShowMessageStatus",
    Copy => "Copy",
    Paste => "Paste",
    AddFile => "Add",
    AddShape => "AddShape",
    AddCurve => "AddWire",
    AddPoints => "AddPoints",
    ProjectPoints => "ProjectPoints",
    Save => "Save",
    AddTarget => "Add_TARGET",
    AddFrame => "Add_FRAME",
    AddProgram => "Add_PROG",
    AddMachiningProject => "Add_MACHINING",
    RunCode => "RunCode",
    RunMessage => "RunMessage",
    Render => "Render",
    IsInside => "IsInside",
    Collisions => "Collisions",
    Collided => "Collided",
    GetSimulationSpeed => "GetSimulateSpeed",
    SetSimulationSpeed => "SimulateSpeed",
    GetRunMode => "G_RunMode",
    SetRunMode => "S_RunMode",
    GetParams => "G_Params",
    GetParam => "G_Param",
    SetParam => "S_Param",
    ShowSequence => "Show_Seq",
    MeasureLaserTracker => "MeasLT",
    CollisionLine => "CollisionLine",
    SetPosesLocal => "S_Hlocals",
    SetPosesAbsolute => "S_Hlocal_AbsS",
    GetJointsList => "G_ThetasList",
    SetJointsList => "S_ThetasList",
    CalibrateTcp => "CalibTCP",
    ProgramStart => "ProgramStart",
    CameraAdd => "Cam2D_Add",
    CameraSnapshot => "Cam2D_Snapshot",
    CameraClose => "Cam2D_Close",
    CameraCloseAll => "Cam2D_CloseAll",
    CameraSetParams => "Cam2D_SetParams",

    // Item
    GetItemType => "G_Item_Type",
    AddGeometry => "CopyFaces",
    Delete => "Remove",
    SetParent => "S_Parent",
    SetParentStatic => "S_Parent_Static",
    AttachClosest => "Attach_Closest",
    DetachClosest => "Detach_Closest",
    DetachAll => "Detach_All",
    GetParent => "G_Parent",
    GetChildren => "G_Childs",
    GetVisible => "G_Visible",
    SetVisible => "S_Visible",
    GetName => "G_Name",
    SetName => "S_Name",
    SetValueString => "S_Gen_Str",
    SetValueMatrix => "S_Gen_Mat",
    GetPose => "G_Hlocal",
    SetPose => "S_Hlocal",
    GetGeometryPose => "G_Hgeom",
    SetGeometryPose => "S_Hgeom",
    GetPoseAbsolute => "G_Hlocal_Abs",
    SetPoseAbsolute => "S_Hlocal_Abs",
    Recolor => "Recolor",
    GetColor => "G_Color",
    SetColor => "S_Color",
    Scale => "Scale",
    SetMachiningParams => "S_MachiningParams",
    SetAsCartesianTarget => "S_Target_As_RT",
    SetAsJointTarget => "S_Target_As_JT",
    GetJoints => "G_Thetas",
    SetJoints => "S_Thetas",
    GetLinkPoses => "G_LinkPoses",
    GetJointsHome => "G_Home",
    GetObjectLink => "G_LinkObjId",
    GetJointLimits => "G_RobLimits",
    SetRobot => "S_Robot",
    SetFrameItem => "S_Frame_ptr",
    SetFramePose => "S_Frame",
    SetToolItem => "S_Tool_ptr",
    SetToolPose => "S_Tool",
    GetFramePose => "G_Frame",
    GetToolPose => "G_Tool",
    AddTool => "AddToolEmpty",
    SolveFk => "G_FK",
    JointsConfig => "G_Thetas_Config",
    SolveIk => "G_IK",
    SolveIkFrom => "G_IK_jnts",
    SolveIkAll => "G_IK_cmpl",
    FilterTarget => "FilterTarget",
    Connect => "Connect",
    GetConnectParams => "ConnectParams",
    SetConnectParams => "setConnectParams",
    ConnectedState => "ConnectedState",
    Disconnect => "Disconnect",
    /// Joint and linear moves
    Move => "MoveX",
    MoveCircular => "MoveC",
    CollisionMove => "CollisionMove",
    CollisionMoveLinear => "CollisionMoveL",
    SetSpeed => "S_Speed4",
    SetZoneData => "S_ZoneData",
    IsBusy => "IsBusy",
    Stop => "Stop",
    /// Blocks until motion completes: runs under the wait-move timeout
    WaitMove => "WaitMove",
    SetAccuracy => "S_AbsAccOn",
    FilterProgram => "FilterProg",

    // Program
    MakeProgram => "MakeProg",
    SetRunType => "S_ProgRunType",
    RunProgram => "RunProg",
    RunProgramWithParams => "RunProgParam",
    AddCustomCode => "RunCode2",
    Pause => "RunPause",
    SetDigitalOutput => "setDO",
    WaitDigitalInput => "waitDI",
    AddMoveInstruction => "Add_INSMOVE",
    ShowInstructions => "Prog_ShowIns",
    InstructionCount => "Prog_Nins",
    GetInstruction => "Prog_GIns",
    SetInstruction => "Prog_SIns",
    InstructionList => "G_ProgInsList",
    JointList => "G_ProgJointList",
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
