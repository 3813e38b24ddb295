macro_rules! query {
    ($sql:expr $(, $arg:expr)* $(,)?) => {{
        #[allow(unused_mut)]
        let mut q = sqlx_core::query::query::<sqlx_postgres::Postgres>($sql);
        $(q = q.bind($arg);)*
        q
    }};
}

macro_rules! query_as {
    ($ty:ty, $sql:expr $(, $arg:expr)* $(,)?) => {{
        #[allow(unused_mut)]
        let mut q = sqlx_core::query_as::query_as::<sqlx_postgres::Postgres, $ty>($sql);
        $(q = q.bind($arg);)*
        q
    }};
}

macro_rules! query_scalar {
    ($ty:ty, $sql:expr $(, $arg:expr)* $(,)?) => {{
        #[allow(unused_mut)]
        let mut q = sqlx_core::query_scalar::query_scalar::<sqlx_postgres::Postgres, $ty>($sql);
        $(q = q.bind($arg);)*
        q
    }};
}

pub(crate) mod prelude {
    pub(crate) use crate::PgPool;
    pub(crate) use chrono::{DateTime, Utc};
    pub(crate) use locker_core::{
        Cipher, Collection, Device, Folder, Group, GroupMember, MemberStatus, Session, Team,
        TeamGroup, TeamMember, TeamMemberRole, User,
    };
    pub(crate) use sqlx_postgres::PgConnection;
    pub(crate) use uuid::Uuid;
}

mod ciphers;
mod devices;
mod folders;
mod groups;
mod sessions;
pub mod sharing;
mod teams;
mod users;

pub use ciphers::CipherRepo;
pub use devices::DeviceRepo;
pub use folders::FolderRepo;
pub use groups::{GroupMemberRepo, GroupRepo};
pub use sessions::SessionRepo;
pub use teams::{CollectionRepo, TeamGroupRepo, TeamMemberRepo, TeamRepo};
pub use users::UserRepo;
