#[cfg(feature = "postgres")]
use sqlx_core::from_row::FromRow;
#[cfg(feature = "postgres")]
use sqlx_core::row::Row;
#[cfg(feature = "postgres")]
use sqlx_postgres::PgRow;

#[cfg(feature = "postgres")]
use super::*;

#[cfg(feature = "postgres")]
fn parse_enum<T: TryFrom<i16, Error = EnumParseError>>(value: i16) -> Result<T, sqlx_core::Error> {
    T::try_from(value).map_err(|err| sqlx_core::Error::Decode(Box::new(err)))
}

macro_rules! impl_from_row {
    ($ty:ty, $row:ident => $body:block) => {
        #[cfg(feature = "postgres")]
        impl FromRow<'_, PgRow> for $ty {
            fn from_row($row: &PgRow) -> Result<Self, sqlx_core::Error> {
                $body
            }
        }
    };
}

impl_from_row!(User, row => {
        let status: i16 = row.try_get("status")?;
        Ok(Self {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            full_name: row.try_get("full_name")?,
            public_key: row.try_get("public_key")?,
            status: parse_enum(status)?,
            revision_date: row.try_get("revision_date")?,
            created_at: row.try_get("created_at")?,
        })
    }
);

impl_from_row!(Session, row => {
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            access_token_hash: row.try_get("access_token_hash")?,
            access_expires_at: row.try_get("access_expires_at")?,
            created_at: row.try_get("created_at")?,
        })
    }
);

impl_from_row!(Device, row => {
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            name: row.try_get("name")?,
            fcm_id: row.try_get("fcm_id")?,
            last_seen_at: row.try_get("last_seen_at")?,
            created_at: row.try_get("created_at")?,
        })
    }
);

impl_from_row!(Team, row => {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            personal_share: row.try_get("personal_share")?,
            locked: row.try_get("locked")?,
            key: row.try_get("key")?,
            revision_date: row.try_get("revision_date")?,
            created_at: row.try_get("created_at")?,
        })
    }
);

impl_from_row!(TeamMember, row => {
        let role: i16 = row.try_get("role")?;
        let status: i16 = row.try_get("status")?;
        Ok(Self {
            id: row.try_get("id")?,
            team_id: row.try_get("team_id")?,
            user_id: row.try_get("user_id")?,
            email: row.try_get("email")?,
            role: parse_enum(role)?,
            status: parse_enum(status)?,
            hide_passwords: row.try_get("hide_passwords")?,
            key: row.try_get("key")?,
            access_time: row.try_get("access_time")?,
            group_id: row.try_get("group_id")?,
            created_at: row.try_get("created_at")?,
        })
    }
);

impl_from_row!(TeamGroup, row => {
        let role: i16 = row.try_get("role")?;
        Ok(Self {
            team_id: row.try_get("team_id")?,
            group_id: row.try_get("group_id")?,
            role: parse_enum(role)?,
            hide_passwords: row.try_get("hide_passwords")?,
            created_at: row.try_get("created_at")?,
        })
    }
);

impl_from_row!(Collection, row => {
        Ok(Self {
            id: row.try_get("id")?,
            team_id: row.try_get("team_id")?,
            name: row.try_get("name")?,
            revision_date: row.try_get("revision_date")?,
            created_at: row.try_get("created_at")?,
        })
    }
);

impl_from_row!(Folder, row => {
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            name: row.try_get("name")?,
            revision_date: row.try_get("revision_date")?,
            created_at: row.try_get("created_at")?,
        })
    }
);

impl_from_row!(Cipher, row => {
        let cipher_type: i16 = row.try_get("cipher_type")?;
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            team_id: row.try_get("team_id")?,
            folder_id: row.try_get("folder_id")?,
            cipher_type: parse_enum(cipher_type)?,
            data: row.try_get("data")?,
            favorite: row.try_get("favorite")?,
            revision_date: row.try_get("revision_date")?,
            created_at: row.try_get("created_at")?,
            deleted_at: row.try_get("deleted_at")?,
        })
    }
);

impl_from_row!(Group, row => {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            created_at: row.try_get("created_at")?,
        })
    }
);

impl_from_row!(GroupMember, row => {
        Ok(Self {
            group_id: row.try_get("group_id")?,
            user_id: row.try_get("user_id")?,
            created_at: row.try_get("created_at")?,
        })
    }
);
