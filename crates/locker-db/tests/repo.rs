#![cfg(feature = "postgres-tests")]

use chrono::Utc;
use locker_core::sharing::{InviteOutcome, MemberInvite};
use locker_core::{Cipher, CipherType, Folder, Group, MemberStatus, TeamMemberRole, User, UserStatus};
use locker_db::repo::sharing::{
    self, InvitePolicy, NewShare, ShareSource, SharingRepo, SharingTxError,
};
use locker_db::repo::{
    CipherRepo, CollectionRepo, FolderRepo, GroupRepo, TeamMemberRepo, TeamRepo, UserRepo,
};
use locker_db::{migrate, PgPool};
use sqlx_core::pool::PoolOptions;
use sqlx_postgres::{PgConnectOptions, Postgres};
use std::env;
use std::str::FromStr;
use uuid::Uuid;

async fn setup_db() -> PgPool {
    let db_url =
        env::var("TEST_DATABASE_URL").expect("TEST_DATABASE_URL must be set for Postgres tests");
    let schema = format!("locker_db_test_{}", Uuid::now_v7().simple());
    let admin_options =
        PgConnectOptions::from_str(&db_url).expect("failed to parse TEST_DATABASE_URL");
    let admin_pool = PoolOptions::new()
        .max_connections(1)
        .connect_with(admin_options.clone())
        .await
        .expect("connect admin pool");
    sqlx_core::query::query::<Postgres>(&format!("CREATE SCHEMA \"{}\"", schema))
        .execute(&admin_pool)
        .await
        .expect("create schema");
    let options = admin_options.options([("search_path", schema.as_str())]);
    let pool = PoolOptions::new()
        .max_connections(4)
        .connect_with(options)
        .await
        .expect("connect test pool");
    migrate(&pool).await.expect("migrate");
    pool
}

async fn create_user(pool: &PgPool, email: &str) -> User {
    let now = Utc::now();
    let user = User {
        id: Uuid::now_v7(),
        email: email.to_string(),
        full_name: None,
        public_key: Some(format!("pk-{email}")),
        status: UserStatus::Active,
        revision_date: now,
        created_at: now,
    };
    UserRepo::new(pool).create(&user).await.expect("create user");
    user
}

async fn create_cipher(pool: &PgPool, owner: &User, folder_id: Option<Uuid>) -> Cipher {
    let now = Utc::now();
    let cipher = Cipher {
        id: Uuid::now_v7(),
        user_id: Some(owner.id),
        team_id: None,
        folder_id,
        cipher_type: CipherType::Login,
        data: "personal-blob".to_string(),
        favorite: false,
        revision_date: now,
        created_at: now,
        deleted_at: None,
    };
    CipherRepo::new(pool).create(&cipher).await.expect("create cipher");
    cipher
}

fn invite(email: &str) -> MemberInvite {
    MemberInvite {
        email: email.to_string(),
        role: TeamMemberRole::Member,
        hide_passwords: false,
        key: None,
    }
}

fn cipher_share(owner: &User, cipher: &Cipher, invites: Vec<MemberInvite>) -> NewShare {
    NewShare {
        owner_id: owner.id,
        owner_email: owner.email.clone(),
        team_name: "Personal share".to_string(),
        team_key: "team-key-for-owner".to_string(),
        source: ShareSource::Cipher {
            cipher_id: cipher.id,
            data: "team-blob".to_string(),
        },
        invites,
        groups: Vec::new(),
        allow_email_invites: true,
        group_admin: false,
        now: Utc::now(),
    }
}

#[tokio::test]
#[cfg_attr(not(feature = "postgres-tests"), ignore = "requires TEST_DATABASE_URL")]
async fn share_cipher_moves_it_into_team() {
    let pool = setup_db().await;
    let owner = create_user(&pool, "owner@example.com").await;
    let bob = create_user(&pool, "bob@example.com").await;
    let cipher = create_cipher(&pool, &owner, None).await;

    let mut tx = pool.begin().await.expect("begin");
    let created = sharing::create_share(
        &mut tx,
        cipher_share(&owner, &cipher, vec![invite("bob@example.com"), invite("new@example.com")]),
    )
    .await
    .expect("create share");
    tx.commit().await.expect("commit");

    assert!(created.team.personal_share);
    assert_eq!(created.invited.len(), 2);
    assert!(created
        .invited
        .iter()
        .all(|invited| invited.outcome == InviteOutcome::Created));

    let moved = CipherRepo::new(&pool)
        .get_by_id(cipher.id)
        .await
        .expect("get")
        .expect("cipher");
    assert_eq!(moved.team_id, Some(created.team.id));
    assert_eq!(moved.user_id, None);
    assert_eq!(moved.data, "team-blob");

    let members = TeamMemberRepo::new(&pool)
        .list_by_team(created.team.id)
        .await
        .expect("members");
    assert_eq!(members.len(), 3);
    let owner_row = members.iter().find(|m| m.is_owner()).expect("owner");
    assert_eq!(owner_row.status, MemberStatus::Confirmed);
    let bob_row = members.iter().find(|m| m.belongs_to(bob.id)).expect("bob");
    assert_eq!(bob_row.status, MemberStatus::Invited);
    let email_only = members
        .iter()
        .find(|m| m.email.as_deref() == Some("new@example.com"))
        .expect("email invite");
    assert_eq!(email_only.user_id, None);
}

#[tokio::test]
#[cfg_attr(not(feature = "postgres-tests"), ignore = "requires TEST_DATABASE_URL")]
async fn reinvite_reports_already_member() {
    let pool = setup_db().await;
    let owner = create_user(&pool, "owner@example.com").await;
    create_user(&pool, "bob@example.com").await;
    let cipher = create_cipher(&pool, &owner, None).await;

    let mut tx = pool.begin().await.expect("begin");
    let created = sharing::create_share(&mut tx, cipher_share(&owner, &cipher, vec![invite("bob@example.com")]))
        .await
        .expect("create share");
    let again = sharing::invite_members(
        &mut tx,
        &created.team,
        owner.id,
        InvitePolicy {
            inviter_id: owner.id,
            group_admin: false,
            allow_email_invites: true,
        },
        vec![invite("bob@example.com")],
        Vec::new(),
        Utc::now(),
    )
    .await
    .expect("reinvite");
    tx.commit().await.expect("commit");

    assert_eq!(again.len(), 1);
    assert_eq!(again[0].outcome, InviteOutcome::AlreadyMember);
    let members = TeamMemberRepo::new(&pool)
        .list_by_team(created.team.id)
        .await
        .expect("members");
    assert_eq!(members.len(), 2);
}

#[tokio::test]
#[cfg_attr(not(feature = "postgres-tests"), ignore = "requires TEST_DATABASE_URL")]
async fn invitation_lifecycle_accept_then_confirm() {
    let pool = setup_db().await;
    let owner = create_user(&pool, "owner@example.com").await;
    let bob = create_user(&pool, "bob@example.com").await;
    let cipher = create_cipher(&pool, &owner, None).await;

    let mut tx = pool.begin().await.expect("begin");
    let created = sharing::create_share(&mut tx, cipher_share(&owner, &cipher, vec![invite("bob@example.com")]))
        .await
        .expect("create share");
    tx.commit().await.expect("commit");
    let member_id = created.invited[0].member.id;

    let mut tx = pool.begin().await.expect("begin");
    let premature =
        sharing::confirm_member(&mut tx, created.team.id, owner.id, member_id, "k", Utc::now()).await;
    assert!(matches!(premature, Err(SharingTxError::Rejected("invalid_member_status"))));
    tx.rollback().await.expect("rollback");

    let mut tx = pool.begin().await.expect("begin");
    let response = sharing::respond_invitation(&mut tx, member_id, bob.id, true, Utc::now())
        .await
        .expect("accept");
    assert_eq!(response.owner_id, owner.id);
    let (confirmed, owner_id) =
        sharing::confirm_member(&mut tx, created.team.id, owner.id, member_id, "bob-key", Utc::now())
            .await
            .expect("confirm");
    assert_eq!(owner_id, owner.id);
    tx.commit().await.expect("commit");

    assert_eq!(confirmed.status, MemberStatus::Confirmed);
    let shared = CipherRepo::new(&pool)
        .list_shared_with(bob.id)
        .await
        .expect("shared");
    assert_eq!(shared.len(), 1);
    assert_eq!(shared[0].id, cipher.id);
}

#[tokio::test]
#[cfg_attr(not(feature = "postgres-tests"), ignore = "requires TEST_DATABASE_URL")]
async fn reject_deletes_membership() {
    let pool = setup_db().await;
    let owner = create_user(&pool, "owner@example.com").await;
    let bob = create_user(&pool, "bob@example.com").await;
    let cipher = create_cipher(&pool, &owner, None).await;

    let mut tx = pool.begin().await.expect("begin");
    let created = sharing::create_share(&mut tx, cipher_share(&owner, &cipher, vec![invite("bob@example.com")]))
        .await
        .expect("create share");
    let member_id = created.invited[0].member.id;
    sharing::respond_invitation(&mut tx, member_id, bob.id, false, Utc::now())
        .await
        .expect("reject");
    tx.commit().await.expect("commit");

    let member = TeamMemberRepo::new(&pool)
        .get_by_id(member_id)
        .await
        .expect("get");
    assert!(member.is_none());
}

#[tokio::test]
#[cfg_attr(not(feature = "postgres-tests"), ignore = "requires TEST_DATABASE_URL")]
async fn share_folder_then_stop_sharing_restores_folder() {
    let pool = setup_db().await;
    let owner = create_user(&pool, "owner@example.com").await;
    create_user(&pool, "bob@example.com").await;
    let now = Utc::now();
    let folder = Folder {
        id: Uuid::now_v7(),
        user_id: owner.id,
        name: "Work".to_string(),
        revision_date: now,
        created_at: now,
    };
    FolderRepo::new(&pool).create(&folder).await.expect("folder");
    let first = create_cipher(&pool, &owner, Some(folder.id)).await;
    let second = create_cipher(&pool, &owner, Some(folder.id)).await;

    let share = |ciphers: Vec<(Uuid, String)>| NewShare {
        owner_id: owner.id,
        owner_email: owner.email.clone(),
        team_name: "Work".to_string(),
        team_key: "team-key".to_string(),
        source: ShareSource::Folder {
            folder_id: folder.id,
            folder_name: "Work".to_string(),
            ciphers,
        },
        invites: vec![invite("bob@example.com")],
        groups: Vec::new(),
        allow_email_invites: true,
        group_admin: false,
        now,
    };

    let mut tx = pool.begin().await.expect("begin");
    let mismatch = sharing::create_share(&mut tx, share(vec![(first.id, "a".to_string())])).await;
    assert!(matches!(mismatch, Err(SharingTxError::Rejected("folder_ciphers_mismatch"))));
    tx.rollback().await.expect("rollback");

    let mut tx = pool.begin().await.expect("begin");
    let created = sharing::create_share(
        &mut tx,
        share(vec![(first.id, "a".to_string()), (second.id, "b".to_string())]),
    )
    .await
    .expect("share folder");
    tx.commit().await.expect("commit");

    let collection = created.collection.clone().expect("collection");
    assert_eq!(collection.name, "Work");
    assert!(FolderRepo::new(&pool)
        .get_by_id(folder.id)
        .await
        .expect("get folder")
        .is_none());
    let links = CipherRepo::new(&pool)
        .list_collection_links(&[first.id, second.id])
        .await
        .expect("links");
    assert_eq!(links.len(), 2);
    assert!(links.iter().all(|(_, collection_id)| *collection_id == collection.id));

    let mut tx = pool.begin().await.expect("begin");
    let partial = sharing::stop_sharing(
        &mut tx,
        created.team.id,
        owner.id,
        vec![(first.id, "a".to_string())],
        None,
        Utc::now(),
    )
    .await;
    assert!(matches!(partial, Err(SharingTxError::Rejected("stop_share_ciphers_mismatch"))));
    tx.rollback().await.expect("rollback");

    let mut tx = pool.begin().await.expect("begin");
    let stopped = sharing::stop_sharing(
        &mut tx,
        created.team.id,
        owner.id,
        vec![(first.id, "a2".to_string()), (second.id, "b2".to_string())],
        Some("Work".to_string()),
        Utc::now(),
    )
    .await
    .expect("stop sharing");
    tx.commit().await.expect("commit");

    let restored = stopped.folder.expect("restored folder");
    let personal = CipherRepo::new(&pool)
        .list_personal(owner.id)
        .await
        .expect("personal");
    assert_eq!(personal.len(), 2);
    assert!(personal.iter().all(|c| c.folder_id == Some(restored.id)));
    assert!(TeamRepo::new(&pool)
        .get_by_id(created.team.id)
        .await
        .expect("team")
        .is_none());
    assert!(CollectionRepo::new(&pool)
        .list_by_team(created.team.id)
        .await
        .expect("collections")
        .is_empty());
}

#[tokio::test]
#[cfg_attr(not(feature = "postgres-tests"), ignore = "requires TEST_DATABASE_URL")]
async fn group_membership_drives_team_membership() {
    let pool = setup_db().await;
    let owner = create_user(&pool, "owner@example.com").await;
    let carol = create_user(&pool, "carol@example.com").await;
    let dave = create_user(&pool, "dave@example.com").await;
    let cipher = create_cipher(&pool, &owner, None).await;

    let group = Group {
        id: Uuid::now_v7(),
        name: "Ops".to_string(),
        created_at: Utc::now(),
    };
    GroupRepo::new(&pool).create(&group).await.expect("group");
    let mut tx = pool.begin().await.expect("begin");
    sharing::add_group_member(&mut tx, group.id, owner.id, Utc::now())
        .await
        .expect("add owner");
    sharing::add_group_member(&mut tx, group.id, carol.id, Utc::now())
        .await
        .expect("add carol");
    let mut share = cipher_share(&owner, &cipher, Vec::new());
    share.groups = vec![locker_core::sharing::GroupInvite {
        group_id: group.id,
        role: TeamMemberRole::Member,
        hide_passwords: true,
    }];
    let created = sharing::create_share(&mut tx, share).await.expect("share");
    tx.commit().await.expect("commit");
    assert_eq!(created.invited.len(), 1);
    assert_eq!(created.invited[0].member.group_id, Some(group.id));
    assert!(created.invited[0].member.hide_passwords);

    let mut tx = pool.begin().await.expect("begin");
    let added = sharing::add_group_member(&mut tx, group.id, dave.id, Utc::now())
        .await
        .expect("add dave");
    tx.commit().await.expect("commit");
    assert_eq!(added.memberships.len(), 1);
    assert_eq!(added.owner_ids, vec![owner.id]);

    let mut tx = pool.begin().await.expect("begin");
    let removed = sharing::remove_group_member(&mut tx, group.id, carol.id)
        .await
        .expect("remove carol");
    tx.commit().await.expect("commit");
    assert_eq!(removed.memberships.len(), 1);
    let remaining = TeamMemberRepo::new(&pool)
        .get_for_user(created.team.id, carol.id)
        .await
        .expect("get");
    assert!(remaining.is_none());
}

#[tokio::test]
#[cfg_attr(not(feature = "postgres-tests"), ignore = "requires TEST_DATABASE_URL")]
async fn new_user_claims_email_invitations() {
    let pool = setup_db().await;
    let owner = create_user(&pool, "owner@example.com").await;
    let cipher = create_cipher(&pool, &owner, None).await;

    let mut tx = pool.begin().await.expect("begin");
    sharing::create_share(&mut tx, cipher_share(&owner, &cipher, vec![invite("late@example.com")]))
        .await
        .expect("share");
    tx.commit().await.expect("commit");

    let now = Utc::now();
    let late = User {
        id: Uuid::now_v7(),
        email: "late@example.com".to_string(),
        full_name: None,
        public_key: None,
        status: UserStatus::Active,
        revision_date: now,
        created_at: now,
    };
    let mut tx = pool.begin().await.expect("begin");
    let (claimed, owners) = sharing::create_user_claiming_invites(&mut tx, &late)
        .await
        .expect("create user");
    tx.commit().await.expect("commit");
    assert_eq!(claimed.len(), 1);
    assert_eq!(owners, vec![owner.id]);

    let invitations = SharingRepo::new(&pool)
        .list_invitations(late.id)
        .await
        .expect("invitations");
    assert_eq!(invitations.len(), 1);
    assert_eq!(invitations[0].owner_email.as_deref(), Some("owner@example.com"));
    assert_eq!(invitations[0].cipher_id, Some(cipher.id));
}

#[tokio::test]
#[cfg_attr(not(feature = "postgres-tests"), ignore = "requires TEST_DATABASE_URL")]
async fn owner_cannot_leave_or_be_removed() {
    let pool = setup_db().await;
    let owner = create_user(&pool, "owner@example.com").await;
    create_user(&pool, "bob@example.com").await;
    let cipher = create_cipher(&pool, &owner, None).await;

    let mut tx = pool.begin().await.expect("begin");
    let created = sharing::create_share(&mut tx, cipher_share(&owner, &cipher, vec![invite("bob@example.com")]))
        .await
        .expect("share");
    let leave = sharing::leave_team(&mut tx, created.team.id, owner.id, Utc::now()).await;
    assert!(matches!(leave, Err(SharingTxError::Rejected("owner_cannot_leave"))));
    let remove =
        sharing::remove_member(&mut tx, created.team.id, owner.id, created.owner.id, Utc::now()).await;
    assert!(matches!(remove, Err(SharingTxError::Rejected("cannot_remove_owner"))));
    tx.rollback().await.expect("rollback");
}

#[tokio::test]
#[cfg_attr(not(feature = "postgres-tests"), ignore = "requires TEST_DATABASE_URL")]
async fn bump_revision_touches_only_listed_users() {
    let pool = setup_db().await;
    let a = create_user(&pool, "a@example.com").await;
    let b = create_user(&pool, "b@example.com").await;
    let later = Utc::now() + chrono::Duration::seconds(30);

    let repo = UserRepo::new(&pool);
    let updated = repo.bump_revision(&[a.id], later).await.expect("bump");
    assert_eq!(updated, 1);
    let a_after = repo.get_by_id(a.id).await.expect("get").expect("a");
    let b_after = repo.get_by_id(b.id).await.expect("get").expect("b");
    assert!(a_after.revision_date > b_after.revision_date);
    assert_eq!(repo.bump_revision(&[], later).await.expect("noop"), 0);
}

async fn accept_and_confirm(pool: &PgPool, team_id: Uuid, owner: &User, member: &User, member_id: Uuid) {
    let mut tx = pool.begin().await.expect("begin");
    sharing::respond_invitation(&mut tx, member_id, member.id, true, Utc::now())
        .await
        .expect("accept");
    sharing::confirm_member(&mut tx, team_id, owner.id, member_id, "wrapped-key", Utc::now())
        .await
        .expect("confirm");
    tx.commit().await.expect("commit");
}

#[tokio::test]
#[cfg_attr(not(feature = "postgres-tests"), ignore = "requires TEST_DATABASE_URL")]
async fn cipher_update_is_refused_once_share_is_stopped() {
    let pool = setup_db().await;
    let owner = create_user(&pool, "owner@example.com").await;
    create_user(&pool, "bob@example.com").await;
    let cipher = create_cipher(&pool, &owner, None).await;

    let mut tx = pool.begin().await.expect("begin");
    let created = sharing::create_share(&mut tx, cipher_share(&owner, &cipher, vec![invite("bob@example.com")]))
        .await
        .expect("share");
    tx.commit().await.expect("commit");

    let repo = CipherRepo::new(&pool);
    let as_team_cipher = repo.get_by_id(cipher.id).await.expect("get").expect("cipher");
    assert_eq!(as_team_cipher.team_id, Some(created.team.id));

    let mut tx = pool.begin().await.expect("begin");
    sharing::stop_sharing(
        &mut tx,
        created.team.id,
        owner.id,
        vec![(cipher.id, "owner-key-blob".to_string())],
        None,
        Utc::now(),
    )
    .await
    .expect("stop");
    tx.commit().await.expect("commit");

    let updated = repo
        .update_data(&as_team_cipher, "team-key-blob", None, Utc::now())
        .await
        .expect("update");
    assert_eq!(updated, 0);
    let restored = repo.get_by_id(cipher.id).await.expect("get").expect("cipher");
    assert_eq!(restored.data, "owner-key-blob");
    assert_eq!(restored.team_id, None);
    assert_eq!(restored.user_id, Some(owner.id));

    let updated = repo
        .update_data(&restored, "owner-key-blob-2", Some(true), Utc::now())
        .await
        .expect("update");
    assert_eq!(updated, 1);
}

#[tokio::test]
#[cfg_attr(not(feature = "postgres-tests"), ignore = "requires TEST_DATABASE_URL")]
async fn invitation_response_waits_for_team_lock() {
    let pool = setup_db().await;
    let owner = create_user(&pool, "owner@example.com").await;
    let bob = create_user(&pool, "bob@example.com").await;
    let cipher = create_cipher(&pool, &owner, None).await;

    let mut tx = pool.begin().await.expect("begin");
    let created = sharing::create_share(&mut tx, cipher_share(&owner, &cipher, vec![invite("bob@example.com")]))
        .await
        .expect("share");
    tx.commit().await.expect("commit");
    let team_id = created.team.id;
    let member_id = created.invited[0].member.id;

    let mut owner_tx = pool.begin().await.expect("begin");
    sharing::lock_team_with_owner(&mut owner_tx, team_id)
        .await
        .expect("lock team");

    let responder = {
        let pool = pool.clone();
        let bob_id = bob.id;
        tokio::spawn(async move {
            let mut tx = pool.begin().await.expect("begin");
            sharing::respond_invitation(&mut tx, member_id, bob_id, false, Utc::now())
                .await
                .map(|response| response.accepted)
        })
    };
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;

    let (removed, _) = sharing::remove_member(&mut owner_tx, team_id, owner.id, member_id, Utc::now())
        .await
        .expect("remove");
    assert_eq!(removed.id, member_id);
    owner_tx.commit().await.expect("commit");

    let response = responder.await.expect("join");
    assert!(matches!(response, Err(SharingTxError::NotFound)), "{response:?}");
}

#[tokio::test]
#[cfg_attr(not(feature = "postgres-tests"), ignore = "requires TEST_DATABASE_URL")]
async fn demoted_admin_can_no_longer_manage_members() {
    let pool = setup_db().await;
    let owner = create_user(&pool, "owner@example.com").await;
    let bob = create_user(&pool, "bob@example.com").await;
    let carol = create_user(&pool, "carol@example.com").await;
    let cipher = create_cipher(&pool, &owner, None).await;

    let mut admin_invite = invite("bob@example.com");
    admin_invite.role = TeamMemberRole::Admin;
    let mut tx = pool.begin().await.expect("begin");
    let created = sharing::create_share(
        &mut tx,
        cipher_share(&owner, &cipher, vec![admin_invite, invite("carol@example.com")]),
    )
    .await
    .expect("share");
    tx.commit().await.expect("commit");
    let team_id = created.team.id;
    let member_of = |user: &User| {
        created
            .invited
            .iter()
            .find(|invited| invited.member.belongs_to(user.id))
            .map(|invited| invited.member.id)
            .expect("member")
    };
    let (bob_member, carol_member) = (member_of(&bob), member_of(&carol));
    accept_and_confirm(&pool, team_id, &owner, &bob, bob_member).await;
    accept_and_confirm(&pool, team_id, &owner, &carol, carol_member).await;

    let mut tx = pool.begin().await.expect("begin");
    let grant = sharing::update_member(
        &mut tx,
        team_id,
        bob.id,
        carol_member,
        Some(TeamMemberRole::Admin),
        None,
        Utc::now(),
    )
    .await;
    assert!(matches!(grant, Err(SharingTxError::Rejected("insufficient_role"))));
    tx.rollback().await.expect("rollback");

    let mut tx = pool.begin().await.expect("begin");
    sharing::update_member(
        &mut tx,
        team_id,
        owner.id,
        bob_member,
        Some(TeamMemberRole::Member),
        None,
        Utc::now(),
    )
    .await
    .expect("demote bob");
    tx.commit().await.expect("commit");

    let mut tx = pool.begin().await.expect("begin");
    let removal = sharing::remove_member(&mut tx, team_id, bob.id, carol_member, Utc::now()).await;
    assert!(matches!(removal, Err(SharingTxError::Rejected("insufficient_role"))));
    tx.rollback().await.expect("rollback");

    let carol_row = TeamMemberRepo::new(&pool)
        .get_by_id(carol_member)
        .await
        .expect("get");
    assert!(carol_row.is_some());
}

#[tokio::test]
#[cfg_attr(not(feature = "postgres-tests"), ignore = "requires TEST_DATABASE_URL")]
async fn group_invite_requires_group_membership() {
    let pool = setup_db().await;
    let owner = create_user(&pool, "owner@example.com").await;
    let carol = create_user(&pool, "carol@example.com").await;
    let cipher = create_cipher(&pool, &owner, None).await;
    let group = Group {
        id: Uuid::now_v7(),
        name: "Finance".to_string(),
        created_at: Utc::now(),
    };
    GroupRepo::new(&pool).create(&group).await.expect("group");
    let mut tx = pool.begin().await.expect("begin");
    sharing::add_group_member(&mut tx, group.id, carol.id, Utc::now())
        .await
        .expect("add carol");
    tx.commit().await.expect("commit");

    let group_share = |group_admin: bool| {
        let mut share = cipher_share(&owner, &cipher, Vec::new());
        share.groups = vec![locker_core::sharing::GroupInvite {
            group_id: group.id,
            role: TeamMemberRole::Member,
            hide_passwords: false,
        }];
        share.group_admin = group_admin;
        share
    };

    let mut tx = pool.begin().await.expect("begin");
    let outsider = sharing::create_share(&mut tx, group_share(false)).await;
    assert!(matches!(outsider, Err(SharingTxError::Forbidden)));
    tx.rollback().await.expect("rollback");

    let mut tx = pool.begin().await.expect("begin");
    let created = sharing::create_share(&mut tx, group_share(true))
        .await
        .expect("group admin shares");
    tx.commit().await.expect("commit");
    assert_eq!(created.invited.len(), 1);
    assert!(created.invited[0].member.belongs_to(carol.id));
}

#[tokio::test]
#[cfg_attr(not(feature = "postgres-tests"), ignore = "requires TEST_DATABASE_URL")]
async fn locked_share_accepts_no_new_ciphers() {
    let pool = setup_db().await;
    let owner = create_user(&pool, "owner@example.com").await;
    create_user(&pool, "bob@example.com").await;
    let now = Utc::now();
    let folder = Folder {
        id: Uuid::now_v7(),
        user_id: owner.id,
        name: "Keys".to_string(),
        revision_date: now,
        created_at: now,
    };
    FolderRepo::new(&pool).create(&folder).await.expect("folder");
    let shared = create_cipher(&pool, &owner, Some(folder.id)).await;
    let later = create_cipher(&pool, &owner, None).await;

    let mut tx = pool.begin().await.expect("begin");
    let created = sharing::create_share(
        &mut tx,
        NewShare {
            owner_id: owner.id,
            owner_email: owner.email.clone(),
            team_name: "Keys".to_string(),
            team_key: "team-key".to_string(),
            source: ShareSource::Folder {
                folder_id: folder.id,
                folder_name: "Keys".to_string(),
                ciphers: vec![(shared.id, "a".to_string())],
            },
            invites: vec![invite("bob@example.com")],
            groups: Vec::new(),
            allow_email_invites: true,
            group_admin: false,
            now,
        },
    )
    .await
    .expect("share folder");
    tx.commit().await.expect("commit");
    let team_id = created.team.id;
    let collection_id = created.collection.expect("collection").id;

    sqlx_core::query::query::<Postgres>("UPDATE teams SET locked = TRUE WHERE id = $1")
        .bind(team_id)
        .execute(&pool)
        .await
        .expect("lock share");
    let mut tx = pool.begin().await.expect("begin");
    let locked = sharing::add_cipher_to_share(
        &mut tx,
        team_id,
        collection_id,
        later.id,
        owner.id,
        "b",
        Utc::now(),
    )
    .await;
    assert!(matches!(locked, Err(SharingTxError::Rejected("team_locked"))));
    tx.rollback().await.expect("rollback");

    sqlx_core::query::query::<Postgres>("UPDATE teams SET locked = FALSE WHERE id = $1")
        .bind(team_id)
        .execute(&pool)
        .await
        .expect("unlock share");
    let mut tx = pool.begin().await.expect("begin");
    sharing::add_cipher_to_share(&mut tx, team_id, collection_id, later.id, owner.id, "b", Utc::now())
        .await
        .expect("add cipher");
    let again = sharing::add_cipher_to_share(
        &mut tx,
        team_id,
        collection_id,
        later.id,
        owner.id,
        "b",
        Utc::now(),
    )
    .await;
    assert!(matches!(again, Err(SharingTxError::Rejected("cipher_in_organization"))));
    tx.commit().await.expect("commit");

    let moved = CipherRepo::new(&pool)
        .get_by_id(later.id)
        .await
        .expect("get")
        .expect("cipher");
    assert_eq!(moved.team_id, Some(team_id));
}
