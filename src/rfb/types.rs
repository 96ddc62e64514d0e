use std::fmt;

/// Protocol versions the client knows how to speak. Anything else a server
/// announces is treated as 3.3, the lowest common denominator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtoVer {
    V3_3,
    V3_7,
    V3_8,
    /// Non-standard, announced by Apple Remote Desktop.
    V3_889,
}

impl ProtoVer {
    /// Map a server banner version triplet ("XXX.YYY") to the version we
    /// will negotiate.
    pub fn from_banner(ver: &str) -> ProtoVer {
        match ver {
            "003.003" => ProtoVer::V3_3,
            "003.007" => ProtoVer::V3_7,
            "003.008" => ProtoVer::V3_8,
            "003.889" => ProtoVer::V3_889,
            // Anything else we don't recognize must be treated as 3.3
            _ => ProtoVer::V3_3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProtoVer::V3_3 => "003.003",
            ProtoVer::V3_7 => "003.007",
            ProtoVer::V3_8 => "003.008",
            ProtoVer::V3_889 => "003.889",
        }
    }
}

impl fmt::Display for ProtoVer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Security types a server may advertise during the handshake. Codes 3..=15
/// (and 128..=255) are assigned to RealVNC, hence the jump from 2 to 16.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VncAuth {
    Invalid,
    /// No authentication at all.
    None,
    /// "VNC Authentication", the DES challenge/response scheme.
    Basic,
    Tight,
    Ultra,
    Tls,
    VenCrypt,
    GtkVncSasl,
    Md5Hash,
    ColinDeanXvp,
    /// Anything we don't recognize, kept around so the probe can report it.
    Other(u8),
}

impl VncAuth {
    pub fn from_code(code: u8) -> VncAuth {
        match code {
            0 => VncAuth::Invalid,
            1 => VncAuth::None,
            2 => VncAuth::Basic,
            16 => VncAuth::Tight,
            17 => VncAuth::Ultra,
            18 => VncAuth::Tls,
            19 => VncAuth::VenCrypt,
            20 => VncAuth::GtkVncSasl,
            21 => VncAuth::Md5Hash,
            22 => VncAuth::ColinDeanXvp,
            other => VncAuth::Other(other),
        }
    }

    pub fn code(self) -> u8 {
        match self {
            VncAuth::Invalid => 0,
            VncAuth::None => 1,
            VncAuth::Basic => 2,
            VncAuth::Tight => 16,
            VncAuth::Ultra => 17,
            VncAuth::Tls => 18,
            VncAuth::VenCrypt => 19,
            VncAuth::GtkVncSasl => 20,
            VncAuth::Md5Hash => 21,
            VncAuth::ColinDeanXvp => 22,
            VncAuth::Other(code) => code,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            VncAuth::Invalid => "Invalid",
            VncAuth::None => "None",
            VncAuth::Basic => "VNC Authentication",
            VncAuth::Tight => "Tight",
            VncAuth::Ultra => "Ultra",
            VncAuth::Tls => "TLS",
            VncAuth::VenCrypt => "VeNCrypt",
            VncAuth::GtkVncSasl => "GTK-VNC SASL",
            VncAuth::Md5Hash => "MD5 hash authentication",
            VncAuth::ColinDeanXvp => "Colin Dean xvp",
            VncAuth::Other(_) => "Unknown",
        }
    }
}

impl fmt::Display for VncAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.code())
    }
}

/// The server's post-auth verdict. A failure is a normal outcome, not an
/// error; `reason` is only non-empty when the server actually supplied one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecurityResult {
    pub success: bool,
    pub reason: String,
}
