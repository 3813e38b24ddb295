mod invitations;
mod members;
mod shares;

pub(crate) use invitations::{list_invitations, respond_invitation};
pub(crate) use members::{
    add_members, confirm_member, leave_team, member_public_key, remove_member, update_member,
};
pub(crate) use shares::{
    add_cipher_to_share, list_shares, share_cipher, share_folder, stop_sharing,
};
