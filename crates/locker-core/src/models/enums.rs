use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug)]
pub struct EnumParseError {
    enum_name: &'static str,
    value: String,
}

impl EnumParseError {
    pub(crate) fn new(enum_name: &'static str, value: impl Into<String>) -> Self {
        Self {
            enum_name,
            value: value.into(),
        }
    }
}

impl std::fmt::Display for EnumParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid {} value: {}", self.enum_name, self.value)
    }
}

impl std::error::Error for EnumParseError {}

macro_rules! stored_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $label:literal {
            $($variant:ident = $value:literal => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(i16)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant = $value),+
        }

        impl $name {
            #[must_use]
            pub const fn as_i16(self) -> i16 {
                self as i16
            }

            #[must_use]
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl TryFrom<i16> for $name {
            type Error = EnumParseError;

            fn try_from(value: i16) -> Result<Self, Self::Error> {
                match value {
                    $($value => Ok(Self::$variant),)+
                    _ => Err(EnumParseError::new($label, value.to_string())),
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = EnumParseError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value {
                    $($text => Ok(Self::$variant),)+
                    _ => Err(EnumParseError::new($label, value)),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

stored_enum!(
    /// Role of a member inside a sharing team.
    TeamMemberRole, "team_member_role" {
        Owner = 1 => "owner",
        Admin = 2 => "admin",
        Manager = 3 => "manager",
        Member = 4 => "member",
    }
);

stored_enum!(
    MemberStatus, "member_status" {
        Invited = 1 => "invited",
        Accepted = 2 => "accepted",
        Confirmed = 3 => "confirmed",
    }
);

stored_enum!(
    CipherType, "cipher_type" {
        Login = 1 => "login",
        SecureNote = 2 => "secure_note",
        Card = 3 => "card",
        Identity = 4 => "identity",
        CryptoWallet = 5 => "crypto_wallet",
        Other = 6 => "other",
    }
);

stored_enum!(
    UserStatus, "user_status" {
        Active = 1 => "active",
        Disabled = 2 => "disabled",
    }
);

impl TeamMemberRole {
    /// Higher ranks carry more privileges.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::Owner => 4,
            Self::Admin => 3,
            Self::Manager => 2,
            Self::Member => 1,
        }
    }

    #[must_use]
    pub const fn can_manage_members(self) -> bool {
        matches!(self, Self::Owner | Self::Admin)
    }

    #[must_use]
    pub const fn can_edit_ciphers(self) -> bool {
        matches!(self, Self::Owner | Self::Admin | Self::Manager)
    }
}

impl MemberStatus {
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Invited, Self::Accepted) | (Self::Accepted, Self::Confirmed)
        )
    }
}
