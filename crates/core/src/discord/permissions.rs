//! Mapping of abstract access onto Discord permission overwrites.

use crate::gateway::{Access, AccessSubject};

pub const VIEW_CHANNEL: u64 = 1 << 10;
pub const SEND_MESSAGES: u64 = 1 << 11;
pub const READ_MESSAGE_HISTORY: u64 = 1 << 16;

/// Overwrite target type as Discord encodes it.
pub const OVERWRITE_ROLE: u8 = 0;
pub const OVERWRITE_MEMBER: u8 = 1;

/// `(allow, deny)` bitsets for an access level.
pub fn overwrite_bits(access: Access) -> (u64, u64) {
    let read = VIEW_CHANNEL | READ_MESSAGE_HISTORY;
    match (access.read, access.write) {
        (true, true) => (read | SEND_MESSAGES, 0),
        (true, false) => (read, SEND_MESSAGES),
        // Write without read is meaningless on Discord.
        (false, _) => (0, VIEW_CHANNEL),
    }
}

/// `(overwrite id, overwrite type)` for a subject. The @everyone role shares
/// the guild's id.
pub fn overwrite_target(subject: AccessSubject, guild_id: u64) -> (u64, u8) {
    match subject {
        AccessSubject::Member(user) => (user.get(), OVERWRITE_MEMBER),
        AccessSubject::Role(role) => (role.get(), OVERWRITE_ROLE),
        AccessSubject::Everyone => (guild_id, OVERWRITE_ROLE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ticket::{RoleId, UserId};

    #[test]
    fn test_overwrite_bits() {
        assert_eq!(overwrite_bits(Access::READ_WRITE), (0x10c00, 0));
        assert_eq!(overwrite_bits(Access::READ_ONLY), (0x10400, 0x800));
        assert_eq!(overwrite_bits(Access::NONE), (0, 0x400));
    }

    #[test]
    fn test_overwrite_target() {
        assert_eq!(overwrite_target(AccessSubject::Member(UserId(5)), 1), (5, 1));
        assert_eq!(overwrite_target(AccessSubject::Role(RoleId(6)), 1), (6, 0));
        assert_eq!(overwrite_target(AccessSubject::Everyone, 1), (1, 0));
    }
}
