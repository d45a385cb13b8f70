#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Ping,
    Instances,
    Refresh,
    Translate,
    View,
    Snapshot,
    DetectEncoding,
    Unknown,
}

impl From<&str> for Command {
    fn from(s: &str) -> Self {
        match s {
            "ping" => Command::Ping,
            "instances" => Command::Instances,
            "refresh" => Command::Refresh,
            "translate" => Command::Translate,
            "view" => Command::View,
            "snapshot" => Command::Snapshot,
            "encoding.detect" | "detect_encoding" => Command::DetectEncoding,
            _ => Command::Unknown,
        }
    }
}
