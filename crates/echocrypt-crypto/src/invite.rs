//! Invite locators: sharing a room key out-of-band.
//!
//! An invite looks like `https://host/invite/<roomId>#<base64(key)>`. The
//! room id sits in the path and may show up in server logs or browser
//! history; the key rides in the fragment, which standard navigation never
//! sends to any server. The key therefore only travels over whatever
//! channel the invite link itself is shared on.

use echocrypt_core::RoomId;
use uuid::Uuid;

use crate::error::InviteError;
use crate::room_key::RoomKey;

/// Path marker preceding the room id segment.
const INVITE_MARKER: &str = "/invite/";

/// Build an invite locator for a room and its key.
///
/// `origin` is the application origin (scheme + host), with or without a
/// trailing slash.
pub fn make_invite(origin: &str, room_id: RoomId, key: &RoomKey) -> String {
    format!("{}{INVITE_MARKER}{room_id}#{}", origin.trim_end_matches('/'), key.to_base64())
}

/// Extract the room id and key from an invite locator.
///
/// # Errors
///
/// - `InviteError::MissingKey` if there is no fragment or it is empty
/// - `InviteError::MissingRoomId` if there is no `/invite/<roomId>` segment
/// - `InviteError::InvalidRoomId` / `InviteError::InvalidKey` if a segment
///   is present but does not decode
pub fn parse_invite(locator: &str) -> Result<(RoomId, RoomKey), InviteError> {
    let (base, fragment) = locator.split_once('#').ok_or(InviteError::MissingKey)?;
    if fragment.is_empty() {
        return Err(InviteError::MissingKey);
    }

    let marker_at = base.rfind(INVITE_MARKER).ok_or(InviteError::MissingRoomId)?;
    let segment = base[marker_at + INVITE_MARKER.len()..].trim_end_matches('/');
    if segment.is_empty() {
        return Err(InviteError::MissingRoomId);
    }

    let room_id = Uuid::parse_str(segment)
        .map_err(|_| InviteError::InvalidRoomId { segment: segment.to_string() })?;
    let key = RoomKey::from_base64(fragment).map_err(|_| InviteError::InvalidKey)?;

    Ok((room_id, key))
}
