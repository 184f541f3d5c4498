//! Platform identifier and role types.
//!
//! Every entity the chat platform hands us — guilds, channels, users,
//! messages — is identified by a [`Snowflake`], a platform-assigned unique
//! numeric ID. The aliases ([`GuildId`], [`ChannelId`], [`UserId`],
//! [`MessageId`]) exist for readability of signatures; they are not
//! distinct types.

use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A platform-assigned unique numeric identifier.
///
/// Serializes as a plain integer, matching the wire representation of the
/// chat platform.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct Snowflake(pub u64);

impl Snowflake {
    /// Creates a snowflake from a raw integer.
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw integer value.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Snowflake {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Snowflake {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Snowflake)
    }
}

impl From<u64> for Snowflake {
    fn from(id: u64) -> Self {
        Snowflake(id)
    }
}

/// Identifier of a guild (server), the unit of state isolation.
pub type GuildId = Snowflake;
/// Identifier of a channel within a guild.
pub type ChannelId = Snowflake;
/// Identifier of a user identity.
pub type UserId = Snowflake;
/// Identifier of a single message.
pub type MessageId = Snowflake;

/// A permission role that a handler may require from its caller.
///
/// Roles are independent sets: holding one role implies nothing about any
/// other. A caller satisfies a role check only by being explicitly enrolled
/// in that exact role's identity set in the guild configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// The bot operator.
    Owner,
    /// Guild administrators.
    Admin,
    /// Guild moderators.
    Moderator,
    /// Regular trusted users.
    User,
}

impl Role {
    /// The config-file spelling of this role.
    pub const fn as_str(self) -> &'static str {
        match self {
            Role::Owner => "OWNER",
            Role::Admin => "ADMIN",
            Role::Moderator => "MODERATOR",
            Role::User => "USER",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OWNER" => Ok(Role::Owner),
            "ADMIN" => Ok(Role::Admin),
            "MODERATOR" => Ok(Role::Moderator),
            "USER" => Ok(Role::User),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// Error returned when parsing a role name that is not defined.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown role name: '{0}'")]
pub struct UnknownRole(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snowflake_display_roundtrip() {
        let id = Snowflake::new(80351110224678912);
        assert_eq!(id.to_string().parse::<Snowflake>().unwrap(), id);
    }

    #[test]
    fn role_parses_config_spelling() {
        assert_eq!("OWNER".parse::<Role>().unwrap(), Role::Owner);
        assert_eq!("MODERATOR".parse::<Role>().unwrap(), Role::Moderator);
        assert!("owner".parse::<Role>().is_err());
        assert!("WIZARD".parse::<Role>().is_err());
    }
}
