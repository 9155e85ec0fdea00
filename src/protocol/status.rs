//! Per-call status trailer
//!
//! Every command ends with one int status code. Codes 2 and 3 are followed by
//! one message line. The raw code is classified into an [`Ack`]; the link turns
//! a fatal ack into an error at its boundary.
//!
//! | code | outcome |
//! |---|---|
//! | 0 | success |
//! | 1 | fatal: invalid item |
//! | 2 | warning + message, call continues |
//! | 3 | fatal: remote error + message |
//! | 9 | fatal: invalid license |
//! | 4..=8, >= 10 | fatal: unknown problem |
//! | < 0 | fatal, unless the command recycles the slot as a value |

use std::io::Read;

use crate::error::{Result, RobolinkError};
use crate::protocol::codec::{read_int, read_line};

/// Message used for status 1
pub const INVALID_ITEM_MESSAGE: &str =
    "Invalid item provided: The item identifier provided is not valid or it does not exist.";

/// Message used for status 9
pub const INVALID_LICENSE_MESSAGE: &str = "Invalid license. Contact us at: www.robodk.com";

/// Message used for unmapped status codes
pub const UNKNOWN_STATUS_MESSAGE: &str = "Problems running function";

/// Fatal status categories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FatalKind {
    /// Status 1
    InvalidItem,
    /// Status 3
    Remote,
    /// Status 9
    InvalidLicense,
    /// Any unmapped code
    Unknown(i32),
}

/// Classified status trailer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ack {
    /// The call succeeded; `code` is 0 unless a passthrough value was accepted
    Success {
        /// Received code
        code: i32,
    },
    /// Status 2: the call succeeded with a warning
    Warning {
        /// Message sent by the server
        message: String,
    },
    /// The call failed
    Fatal {
        /// Failure category
        kind: FatalKind,
        /// Server message (status 3) or the fixed message of the category
        message: String,
    },
}

/// How a command interprets codes outside the status table
///
/// Some RoboDK commands reuse the status slot to return a value; such a slot
/// is read with [`StatusPolicy::Passthrough`]. The link dispatcher always
/// reads with [`StatusPolicy::Strict`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusPolicy {
    /// Only 0 and 2 succeed
    #[default]
    Strict,
    /// Negative and >= 10 codes are returned as values
    Passthrough,
}

impl Ack {
    /// Classify a code, reading the trailing message for codes 2 and 3
    pub fn read<R: Read>(reader: &mut R, policy: StatusPolicy) -> Result<Ack> {
        let code = read_int(reader)?;
        let ack = match code {
            0 => Ack::Success { code },
            1 => Ack::Fatal {
                kind: FatalKind::InvalidItem,
                message: INVALID_ITEM_MESSAGE.to_string(),
            },
            2 => Ack::Warning {
                message: read_line(reader)?,
            },
            3 => Ack::Fatal {
                kind: FatalKind::Remote,
                message: read_line(reader)?,
            },
            9 => Ack::Fatal {
                kind: FatalKind::InvalidLicense,
                message: INVALID_LICENSE_MESSAGE.to_string(),
            },
            c if policy == StatusPolicy::Passthrough && !(0..10).contains(&c) => {
                Ack::Success { code }
            }
            c => Ack::Fatal {
                kind: FatalKind::Unknown(c),
                message: UNKNOWN_STATUS_MESSAGE.to_string(),
            },
        };
        Ok(ack)
    }

    /// True unless the ack is fatal
    pub fn is_ok(&self) -> bool {
        !matches!(self, Ack::Fatal { .. })
    }

    /// Convert to the crate result
    ///
    /// Success yields its code, a warning yields 0, a fatal ack becomes the
    /// matching [`RobolinkError`].
    pub fn into_result(self) -> Result<i32> {
        match self {
            Ack::Success { code } => Ok(code),
            Ack::Warning { .. } => Ok(0),
            Ack::Fatal { kind, message } => Err(match kind {
                FatalKind::InvalidItem => RobolinkError::InvalidItem,
                FatalKind::Remote => RobolinkError::Remote(message),
                FatalKind::InvalidLicense => RobolinkError::InvalidLicense,
                FatalKind::Unknown(code) => RobolinkError::UnknownStatus(code),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::{BufMut, BytesMut};
    use std::io::Cursor;

    fn trailer(code: i32, message: Option<&str>) -> Cursor<Vec<u8>> {
        let mut buf = BytesMut::new();
        buf.put_i32(code);
        if let Some(m) = message {
            buf.put_slice(m.as_bytes());
            buf.put_u8(b'\n');
        }
        Cursor::new(buf.to_vec())
    }

    fn strict(code: i32, message: Option<&str>) -> Ack {
        Ack::read(&mut trailer(code, message), StatusPolicy::Strict).unwrap()
    }

    #[test]
    fn test_status_table() {
        assert_eq!(strict(0, None), Ack::Success { code: 0 });
        assert!(matches!(
            strict(0, None).into_result(),
            Ok(0)
        ));

        assert!(matches!(
            strict(1, None).into_result(),
            Err(RobolinkError::InvalidItem)
        ));

        let warning = strict(2, Some("Target is close to a singularity"));
        assert_eq!(
            warning,
            Ack::Warning {
                message: "Target is close to a singularity".to_string()
            }
        );
        assert!(warning.is_ok());
        assert_eq!(warning.into_result().unwrap(), 0);

        match strict(3, Some("Unreachable target")).into_result() {
            Err(RobolinkError::Remote(msg)) => assert_eq!(msg, "Unreachable target"),
            other => panic!("unexpected {:?}", other),
        }

        assert!(matches!(
            strict(9, None).into_result(),
            Err(RobolinkError::InvalidLicense)
        ));

        for code in [4, 5, 8, 10, 42, -1] {
            assert!(matches!(
                strict(code, None).into_result(),
                Err(RobolinkError::UnknownStatus(c)) if c == code
            ));
        }
    }

    #[test]
    fn test_warning_consumes_only_its_message() {
        let mut buf = BytesMut::new();
        buf.put_i32(2);
        buf.put_slice(b"careful\n");
        buf.put_i32(7);
        let mut cursor = Cursor::new(buf.to_vec());
        Ack::read(&mut cursor, StatusPolicy::Strict).unwrap();
        assert_eq!(cursor.position(), 12);
    }

    #[test]
    fn test_passthrough_returns_out_of_table_codes() {
        for code in [-1, -3, 10, 1000] {
            let ack = Ack::read(&mut trailer(code, None), StatusPolicy::Passthrough).unwrap();
            assert_eq!(ack.into_result().unwrap(), code);
        }
        // the table itself is unchanged
        let ack = Ack::read(&mut trailer(5, None), StatusPolicy::Passthrough).unwrap();
        assert_eq!(
            ack,
            Ack::Fatal {
                kind: FatalKind::Unknown(5),
                message: UNKNOWN_STATUS_MESSAGE.to_string()
            }
        );
        let ack = Ack::read(&mut trailer(3, Some("boom")), StatusPolicy::Passthrough).unwrap();
        assert!(!ack.is_ok());
    }
}
