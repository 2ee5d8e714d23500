use flowseed_core::db::open_db_in_memory;
use flowseed_core::{
    demo_model_spec, DeploymentSpec, DirResourceLoader, GroupSpec, GroupType, Group,
    IdentityStore, Picture, RepoResult, RepositoryStore, SeedError, Seeder,
    SqliteIdentityStore, SqliteRepositoryStore, User, UserSpec,
};
use rusqlite::Connection;
use std::cell::Cell;
use std::path::Path;
use tempfile::TempDir;

/// Identity store that counts avatar and profile writes.
struct RecordingIdentity<'conn> {
    inner: SqliteIdentityStore<'conn>,
    picture_writes: Cell<usize>,
    info_writes: Cell<usize>,
    users_created: Cell<usize>,
}

impl<'conn> RecordingIdentity<'conn> {
    fn new(conn: &'conn Connection) -> Self {
        Self {
            inner: SqliteIdentityStore::try_new(conn).unwrap(),
            picture_writes: Cell::new(0),
            info_writes: Cell::new(0),
            users_created: Cell::new(0),
        }
    }
}

impl IdentityStore for RecordingIdentity<'_> {
    fn count_groups_by_id(&self, group_id: &str) -> RepoResult<u64> {
        self.inner.count_groups_by_id(group_id)
    }
    fn create_group(&self, group: &Group) -> RepoResult<()> {
        self.inner.create_group(group)
    }
    fn get_group(&self, group_id: &str) -> RepoResult<Option<Group>> {
        self.inner.get_group(group_id)
    }
    fn list_groups(&self) -> RepoResult<Vec<Group>> {
        self.inner.list_groups()
    }
    fn count_users_by_id(&self, user_id: &str) -> RepoResult<u64> {
        self.inner.count_users_by_id(user_id)
    }
    fn create_user(&self, user: &User) -> RepoResult<()> {
        self.users_created.set(self.users_created.get() + 1);
        self.inner.create_user(user)
    }
    fn get_user(&self, user_id: &str) -> RepoResult<Option<User>> {
        self.inner.get_user(user_id)
    }
    fn list_users(&self) -> RepoResult<Vec<User>> {
        self.inner.list_users()
    }
    fn create_membership(&self, user_id: &str, group_id: &str) -> RepoResult<()> {
        self.inner.create_membership(user_id, group_id)
    }
    fn list_user_groups(&self, user_id: &str) -> RepoResult<Vec<String>> {
        self.inner.list_user_groups(user_id)
    }
    fn set_user_picture(&self, user_id: &str, picture: &Picture) -> RepoResult<()> {
        self.picture_writes.set(self.picture_writes.get() + 1);
        self.inner.set_user_picture(user_id, picture)
    }
    fn get_user_picture(&self, user_id: &str) -> RepoResult<Option<Picture>> {
        self.inner.get_user_picture(user_id)
    }
    fn set_user_info(&self, user_id: &str, key: &str, value: &str) -> RepoResult<()> {
        self.info_writes.set(self.info_writes.get() + 1);
        self.inner.set_user_info(user_id, key, value)
    }
    fn list_user_info(&self, user_id: &str) -> RepoResult<Vec<(String, String)>> {
        self.inner.list_user_info(user_id)
    }
}

fn resource_dir(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (name, contents) in files {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, contents.as_bytes()).unwrap();
    }
    dir
}

fn seeder<'conn>(
    conn: &'conn Connection,
    resources: &Path,
) -> Seeder<SqliteIdentityStore<'conn>, SqliteRepositoryStore<'conn>, DirResourceLoader> {
    Seeder::new(
        SqliteIdentityStore::try_new(conn).unwrap(),
        SqliteRepositoryStore::try_new(conn).unwrap(),
        DirResourceLoader::new(resources),
    )
}

fn kermit(profile: &[&str]) -> UserSpec {
    UserSpec {
        id: "kermit".to_string(),
        first_name: "Kermit".to_string(),
        last_name: "The Frog".to_string(),
        password: "kermit".to_string(),
        email: "kermit@example.org".to_string(),
        avatar: Some("kermit.jpg".to_string()),
        groups: vec!["student".to_string(), "admin".to_string()],
        profile: profile.iter().map(|value| value.to_string()).collect(),
    }
}

fn assignment_and_admin_groups() -> Vec<GroupSpec> {
    vec![
        GroupSpec::new("student", GroupType::Assignment),
        GroupSpec::new("admin", GroupType::SecurityRole),
    ]
}

#[test]
fn ensure_groups_twice_creates_each_group_once() {
    let conn = open_db_in_memory().unwrap();
    let resources = resource_dir(&[]);
    let seeder = seeder(&conn, resources.path());
    let groups = assignment_and_admin_groups();

    let first = seeder.ensure_groups(&groups).unwrap();
    let second = seeder.ensure_groups(&groups).unwrap();

    assert_eq!((first.created, first.skipped), (2, 0));
    assert_eq!((second.created, second.skipped), (0, 2));
    let stored = seeder.identity().list_groups().unwrap();
    assert_eq!(stored.len(), 2);
    let student = seeder.identity().get_group("student").unwrap().unwrap();
    assert_eq!(student.name, "Student");
    assert_eq!(student.kind, GroupType::Assignment);
}

#[test]
fn ensure_groups_does_not_touch_existing_group() {
    let conn = open_db_in_memory().unwrap();
    let resources = resource_dir(&[]);
    let seeder = seeder(&conn, resources.path());
    seeder
        .identity()
        .create_group(&Group {
            id: "admin".to_string(),
            name: "Administrators".to_string(),
            kind: GroupType::Assignment,
        })
        .unwrap();

    seeder
        .ensure_groups(&[GroupSpec::new("admin", GroupType::SecurityRole)])
        .unwrap();

    let admin = seeder.identity().get_group("admin").unwrap().unwrap();
    assert_eq!(admin.name, "Administrators");
    assert_eq!(admin.kind, GroupType::Assignment);
}

#[test]
fn ensure_user_creates_user_with_memberships_avatar_and_profile() {
    let conn = open_db_in_memory().unwrap();
    let resources = resource_dir(&[("kermit.jpg", "jpeg-bytes")]);
    let seeder = seeder(&conn, resources.path());
    seeder.ensure_groups(&assignment_and_admin_groups()).unwrap();

    let created = seeder
        .ensure_user(&kermit(&["jobTitle", "Muppet", "location", "Hollywood"]))
        .unwrap();

    assert!(created);
    let identity = seeder.identity();
    let user = identity.get_user("kermit").unwrap().unwrap();
    assert_eq!(user.first_name, "Kermit");
    assert_eq!(user.last_name, "The Frog");
    assert_eq!(user.email, "kermit@example.org");
    assert_eq!(
        identity.list_user_groups("kermit").unwrap(),
        vec!["student".to_string(), "admin".to_string()]
    );
    let picture = identity.get_user_picture("kermit").unwrap().unwrap();
    assert_eq!(picture.bytes, b"jpeg-bytes".to_vec());
    assert_eq!(picture.mime_type, "image/jpeg");
    assert_eq!(
        identity.list_user_info("kermit").unwrap(),
        vec![
            ("jobTitle".to_string(), "Muppet".to_string()),
            ("location".to_string(), "Hollywood".to_string()),
        ]
    );
}

// Avatar and profile writes are applied on every boot, even when the user
// already exists. This mirrors the engine-backed behavior and is kept on
// purpose; change this test only together with the seeder contract.
#[test]
fn ensure_user_again_skips_creation_but_reapplies_avatar_and_profile() {
    let conn = open_db_in_memory().unwrap();
    let resources = resource_dir(&[("kermit.jpg", "first")]);
    let seeder = Seeder::new(
        RecordingIdentity::new(&conn),
        SqliteRepositoryStore::try_new(&conn).unwrap(),
        DirResourceLoader::new(resources.path()),
    );
    seeder.ensure_groups(&assignment_and_admin_groups()).unwrap();

    assert!(seeder.ensure_user(&kermit(&["jobTitle", "Muppet"])).unwrap());
    std::fs::write(resources.path().join("kermit.jpg"), b"second").unwrap();
    assert!(!seeder.ensure_user(&kermit(&["jobTitle", "Frog"])).unwrap());

    let identity = seeder.identity();
    assert_eq!(identity.users_created.get(), 1);
    assert_eq!(identity.list_users().unwrap().len(), 1);
    assert_eq!(identity.list_user_groups("kermit").unwrap().len(), 2);
    assert_eq!(identity.picture_writes.get(), 2);
    assert_eq!(identity.info_writes.get(), 2);
    assert_eq!(
        identity.get_user_picture("kermit").unwrap().unwrap().bytes,
        b"second".to_vec()
    );
    assert_eq!(
        identity.list_user_info("kermit").unwrap(),
        vec![("jobTitle".to_string(), "Frog".to_string())]
    );
}

#[test]
fn ensure_user_rejects_odd_profile_list_before_writing() {
    let conn = open_db_in_memory().unwrap();
    let resources = resource_dir(&[("kermit.jpg", "jpeg")]);
    let seeder = Seeder::new(
        RecordingIdentity::new(&conn),
        SqliteRepositoryStore::try_new(&conn).unwrap(),
        DirResourceLoader::new(resources.path()),
    );
    seeder.ensure_groups(&assignment_and_admin_groups()).unwrap();

    let err = seeder
        .ensure_user(&kermit(&["jobTitle", "Muppet", "location"]))
        .unwrap_err();

    assert!(matches!(
        err,
        SeedError::OddProfileAttributes { ref user_id, len: 3 } if user_id == "kermit"
    ));
    let identity = seeder.identity();
    assert_eq!(identity.users_created.get(), 0);
    assert_eq!(identity.picture_writes.get(), 0);
    assert_eq!(identity.info_writes.get(), 0);
}

#[test]
fn ensure_user_accepts_single_pair_and_empty_profile() {
    let conn = open_db_in_memory().unwrap();
    let resources = resource_dir(&[("kermit.jpg", "jpeg")]);
    let seeder = seeder(&conn, resources.path());
    seeder.ensure_groups(&assignment_and_admin_groups()).unwrap();

    seeder.ensure_user(&kermit(&[])).unwrap();
    assert!(seeder.identity().list_user_info("kermit").unwrap().is_empty());

    seeder.ensure_user(&kermit(&["skype", "kermit_frog"])).unwrap();
    assert_eq!(seeder.identity().list_user_info("kermit").unwrap().len(), 1);
}

#[test]
fn missing_avatar_is_logged_and_skipped() {
    let conn = open_db_in_memory().unwrap();
    let resources = resource_dir(&[]);
    let seeder = seeder(&conn, resources.path());
    seeder.ensure_groups(&assignment_and_admin_groups()).unwrap();

    let created = seeder.ensure_user(&kermit(&["phone", "+123"])).unwrap();

    assert!(created);
    assert!(seeder.identity().get_user_picture("kermit").unwrap().is_none());
    assert_eq!(seeder.identity().list_user_info("kermit").unwrap().len(), 1);
}

#[test]
fn membership_to_unknown_group_aborts() {
    let conn = open_db_in_memory().unwrap();
    let resources = resource_dir(&[]);
    let seeder = seeder(&conn, resources.path());

    let mut spec = kermit(&[]);
    spec.avatar = None;
    let err = seeder.ensure_user(&spec).unwrap_err();
    assert!(matches!(err, SeedError::Repo(_)));
}

#[test]
fn ensure_deployment_creates_once_with_declared_order() {
    let conn = open_db_in_memory().unwrap();
    let resources = resource_dir(&[
        ("b.bpmn", "<b/>"),
        ("a.bpmn", "<a/>"),
        ("c.bpmn", "<c/>"),
    ]);
    let seeder = seeder(&conn, resources.path());
    let spec = DeploymentSpec {
        name: "WorkFlow processes".to_string(),
        resources: vec!["b.bpmn".to_string(), "a.bpmn".to_string(), "c.bpmn".to_string()],
    };

    assert!(seeder.ensure_deployment(&spec).unwrap());
    assert!(!seeder.ensure_deployment(&spec).unwrap());

    let deployments = seeder
        .repository()
        .list_deployments_by_name("WorkFlow processes")
        .unwrap();
    assert_eq!(deployments.len(), 1);
    let names: Vec<String> = seeder
        .repository()
        .list_deployment_resources(deployments[0].id)
        .unwrap()
        .into_iter()
        .map(|resource| resource.name)
        .collect();
    assert_eq!(names, vec!["b.bpmn", "a.bpmn", "c.bpmn"]);
}

#[test]
fn ensure_deployment_ignores_changed_resource_list_when_name_exists() {
    let conn = open_db_in_memory().unwrap();
    let resources = resource_dir(&[("a.bpmn", "<a/>"), ("new.bpmn", "<new/>")]);
    let seeder = seeder(&conn, resources.path());

    seeder
        .ensure_deployment(&DeploymentSpec {
            name: "WorkFlow processes".to_string(),
            resources: vec!["a.bpmn".to_string()],
        })
        .unwrap();
    let created = seeder
        .ensure_deployment(&DeploymentSpec {
            name: "WorkFlow processes".to_string(),
            resources: vec!["a.bpmn".to_string(), "new.bpmn".to_string()],
        })
        .unwrap();

    assert!(!created);
    let deployments = seeder.repository().list_deployments().unwrap();
    assert_eq!(deployments.len(), 1);
    assert_eq!(
        seeder
            .repository()
            .list_deployment_resources(deployments[0].id)
            .unwrap()
            .len(),
        1
    );
}

#[test]
fn missing_deployment_resource_aborts_without_partial_deployment() {
    let conn = open_db_in_memory().unwrap();
    let resources = resource_dir(&[("a.bpmn", "<a/>")]);
    let seeder = seeder(&conn, resources.path());

    let err = seeder
        .ensure_deployment(&DeploymentSpec {
            name: "WorkFlow processes".to_string(),
            resources: vec!["a.bpmn".to_string(), "missing.bpmn".to_string()],
        })
        .unwrap_err();

    assert!(matches!(err, SeedError::Resource { ref name, .. } if name == "missing.bpmn"));
    assert!(seeder.repository().list_deployments().unwrap().is_empty());
}

#[test]
fn ensure_model_attaches_sources_and_is_idempotent() {
    let conn = open_db_in_memory().unwrap();
    let resources = resource_dir(&[
        ("demo/model/test.svg", "<svg/>"),
        ("demo/model/test.model.json", "{\"stencil\":{}}"),
    ]);
    let seeder = seeder(&conn, resources.path());
    let spec = demo_model_spec();

    let model_id = seeder.ensure_model(&spec).unwrap().unwrap();
    assert!(seeder.ensure_model(&spec).unwrap().is_none());

    let model = seeder.repository().get_model(model_id).unwrap().unwrap();
    let meta: serde_json::Value = serde_json::from_str(&model.meta_info).unwrap();
    assert_eq!(meta["name"], "Demo model");
    assert_eq!(meta["description"], "This is a demo model");
    assert_eq!(model.editor_source_extra.as_deref(), Some(&b"<svg/>"[..]));
    assert_eq!(
        model.editor_source.as_deref(),
        Some(&b"{\"stencil\":{}}"[..])
    );
    assert_eq!(
        seeder
            .repository()
            .list_models_by_name("Demo model")
            .unwrap()
            .len(),
        1
    );
}

#[test]
fn ensure_model_swallows_missing_attachments() {
    let conn = open_db_in_memory().unwrap();
    let resources = resource_dir(&[]);
    let seeder = seeder(&conn, resources.path());

    let model_id = seeder.ensure_model(&demo_model_spec()).unwrap().unwrap();

    let model = seeder.repository().get_model(model_id).unwrap().unwrap();
    assert!(model.editor_source.is_none());
    assert!(model.editor_source_extra.is_none());
}

#[test]
fn seed_does_not_run_model_path() {
    let conn = open_db_in_memory().unwrap();
    let files: Vec<(&str, &str)> = flowseed_core::WORKFLOW_RESOURCES
        .iter()
        .map(|name| (*name, "<definitions/>"))
        .collect();
    let resources = resource_dir(&files);
    let seeder = seeder(&conn, resources.path());

    seeder.seed().unwrap();

    assert!(seeder
        .repository()
        .list_models_by_name("Demo model")
        .unwrap()
        .is_empty());
}
