//! In-memory GitLab used by the engine tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use gitsync_directory::{DirectoryGroup, DirectoryTree, DirectoryUser};
use gitsync_gitlab::{
    AccessLevel, GitlabApi, GitlabError, GitlabResult, Group, Identity, Member, NewGroup, User,
    UserState,
};

/// A write issued against the fake, named for readable assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    CreateGroup(String),
    AddMember {
        group: String,
        user: String,
        level: AccessLevel,
    },
    RemoveMember {
        group: String,
        user: String,
    },
    PromoteAdmin(String),
    Block(String),
    Unblock(String),
}

#[derive(Default)]
struct State {
    groups: BTreeMap<u64, Group>,
    members: BTreeMap<u64, BTreeMap<u64, AccessLevel>>,
    users: BTreeMap<u64, User>,
    current_user: u64,
    next_id: u64,
    mutations: Vec<Mutation>,
    failing_writes: bool,
    lost_responses: u32,
}

impl State {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn group_name(&self, id: u64) -> String {
        self.groups.get(&id).map(|g| g.name.clone()).unwrap_or_default()
    }

    fn username(&self, id: u64) -> String {
        self.users.get(&id).map(|u| u.username.clone()).unwrap_or_default()
    }

    /// Record an applied write, then report it as failed while responses
    /// are being lost.
    fn applied(&mut self, mutation: Mutation) -> GitlabResult<()> {
        self.mutations.push(mutation);
        if self.lost_responses > 0 {
            self.lost_responses -= 1;
            return Err(GitlabError::Api {
                status: 503,
                detail: "Service Unavailable".into(),
            });
        }
        Ok(())
    }
}

/// GitLab fake. The technical account `gitsync-bot` exists from the start.
pub struct FakeGitlab {
    state: Mutex<State>,
}

impl Default for FakeGitlab {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeGitlab {
    pub fn new() -> Self {
        let fake = Self {
            state: Mutex::new(State {
                next_id: 1000,
                ..State::default()
            }),
        };
        let bot = fake.add_user("gitsync-bot");
        fake.set_admin("gitsync-bot", true);
        fake.state.lock().unwrap().current_user = bot;
        fake
    }

    pub fn add_user(&self, username: &str) -> u64 {
        let mut state = self.state.lock().unwrap();
        let id = state.next_id();
        state.users.insert(
            id,
            User {
                id,
                username: username.into(),
                is_admin: false,
                state: UserState::Active,
                identities: Vec::new(),
            },
        );
        id
    }

    /// A user linked to the `ldapmain` provider with `cn=<cn>,ou=people,o=example`.
    pub fn add_ldap_user(&self, username: &str, cn: &str) -> u64 {
        let id = self.add_user(username);
        let mut state = self.state.lock().unwrap();
        if let Some(user) = state.users.get_mut(&id) {
            user.identities.push(Identity {
                provider: "ldapmain".into(),
                extern_uid: format!("cn={cn},ou=people,o=example"),
            });
        }
        id
    }

    pub fn set_admin(&self, username: &str, admin: bool) {
        self.with_user(username, |u| u.is_admin = admin);
    }

    pub fn set_state(&self, username: &str, user_state: UserState) {
        self.with_user(username, |u| u.state = user_state.clone());
    }

    fn with_user(&self, username: &str, f: impl Fn(&mut User)) {
        let mut state = self.state.lock().unwrap();
        for user in state.users.values_mut().filter(|u| u.username == username) {
            f(user);
        }
    }

    pub fn add_group(&self, name: &str) -> u64 {
        let mut state = self.state.lock().unwrap();
        let id = state.next_id();
        state.groups.insert(
            id,
            Group {
                id,
                name: name.into(),
                path: name.into(),
                full_path: name.into(),
            },
        );
        state.members.insert(id, BTreeMap::new());
        id
    }

    pub fn add_membership(&self, group: &str, username: &str, level: AccessLevel) {
        let mut state = self.state.lock().unwrap();
        let group_id = find_id(state.groups.values().map(|g| (g.id, &g.name)), group);
        let user_id = find_id(state.users.values().map(|u| (u.id, &u.username)), username);
        state.members.entry(group_id).or_default().insert(user_id, level);
    }

    pub fn access_level(&self, group: &str, username: &str) -> Option<AccessLevel> {
        let state = self.state.lock().unwrap();
        let group_id = state.groups.values().find(|g| g.name == group)?.id;
        let user_id = state.users.values().find(|u| u.username == username)?.id;
        state.members.get(&group_id)?.get(&user_id).copied()
    }

    pub fn user(&self, username: &str) -> Option<User> {
        let state = self.state.lock().unwrap();
        state.users.values().find(|u| u.username == username).cloned()
    }

    pub fn has_group(&self, name: &str) -> bool {
        let state = self.state.lock().unwrap();
        state.groups.values().any(|g| g.name == name)
    }

    pub fn mutations(&self) -> Vec<Mutation> {
        self.state.lock().unwrap().mutations.clone()
    }

    /// Make every membership write fail with HTTP 500.
    pub fn fail_writes(&self) {
        self.state.lock().unwrap().failing_writes = true;
    }

    /// The next `count` group or membership writes are applied but answered
    /// with HTTP 503.
    pub fn lose_responses(&self, count: u32) {
        self.state.lock().unwrap().lost_responses = count;
    }

    pub fn clear_mutations(&self) {
        self.state.lock().unwrap().mutations.clear();
    }
}

fn find_id<'a>(mut items: impl Iterator<Item = (u64, &'a String)>, name: &str) -> u64 {
    items
        .find(|(_, n)| n.as_str() == name)
        .map(|(id, _)| id)
        .unwrap_or_else(|| panic!("unknown name {name}"))
}

#[async_trait]
impl GitlabApi for FakeGitlab {
    async fn list_groups(&self) -> GitlabResult<Vec<Group>> {
        Ok(self.state.lock().unwrap().groups.values().cloned().collect())
    }

    async fn get_group(&self, path: &str) -> GitlabResult<Option<Group>> {
        let state = self.state.lock().unwrap();
        Ok(state.groups.values().find(|g| g.path == path).cloned())
    }

    async fn create_group(&self, group: &NewGroup) -> GitlabResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.groups.values().any(|g| g.path == group.path) {
            return Err(GitlabError::Api {
                status: 400,
                detail: r#"{"message":{"path":["has already been taken"]}}"#.into(),
            });
        }
        let id = state.next_id();
        state.groups.insert(
            id,
            Group {
                id,
                name: group.name.clone(),
                path: group.path.clone(),
                full_path: group.path.clone(),
            },
        );
        state.members.insert(id, BTreeMap::new());
        state.applied(Mutation::CreateGroup(group.name.clone()))
    }

    async fn list_members(&self, group_id: u64) -> GitlabResult<Vec<Member>> {
        let state = self.state.lock().unwrap();
        let members = state
            .members
            .get(&group_id)
            .ok_or_else(|| GitlabError::NotFound(format!("group {group_id}")))?;
        Ok(members
            .iter()
            .map(|(user_id, level)| Member {
                id: *user_id,
                username: state.username(*user_id),
                access_level: *level,
                state: UserState::Active,
            })
            .collect())
    }

    async fn add_member(&self, group_id: u64, user_id: u64, level: AccessLevel) -> GitlabResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.failing_writes {
            return Err(GitlabError::Api {
                status: 500,
                detail: "Internal Server Error".into(),
            });
        }
        let members = state.members.entry(group_id).or_default();
        if members.contains_key(&user_id) {
            return Err(GitlabError::Api {
                status: 409,
                detail: "Member already exists".into(),
            });
        }
        members.insert(user_id, level);
        let mutation = Mutation::AddMember {
            group: state.group_name(group_id),
            user: state.username(user_id),
            level,
        };
        state.applied(mutation)
    }

    async fn remove_member(&self, group_id: u64, user_id: u64) -> GitlabResult<()> {
        let mut state = self.state.lock().unwrap();
        let removed = state
            .members
            .get_mut(&group_id)
            .and_then(|m| m.remove(&user_id));
        if removed.is_none() {
            return Err(GitlabError::NotFound("404 Member Not Found".into()));
        }
        let mutation = Mutation::RemoveMember {
            group: state.group_name(group_id),
            user: state.username(user_id),
        };
        state.applied(mutation)
    }

    async fn list_users(&self) -> GitlabResult<Vec<User>> {
        Ok(self.state.lock().unwrap().users.values().cloned().collect())
    }

    async fn current_user(&self) -> GitlabResult<User> {
        let state = self.state.lock().unwrap();
        Ok(state.users[&state.current_user].clone())
    }

    async fn promote_to_admin(&self, user_id: u64) -> GitlabResult<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(user) = state.users.get_mut(&user_id) {
            user.is_admin = true;
        }
        let mutation = Mutation::PromoteAdmin(state.username(user_id));
        state.mutations.push(mutation);
        Ok(())
    }

    async fn block_user(&self, user_id: u64) -> GitlabResult<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(user) = state.users.get_mut(&user_id) {
            user.state = UserState::Blocked;
        }
        let mutation = Mutation::Block(state.username(user_id));
        state.mutations.push(mutation);
        Ok(())
    }

    async fn unblock_user(&self, user_id: u64) -> GitlabResult<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(user) = state.users.get_mut(&user_id) {
            user.state = UserState::Active;
        }
        let mutation = Mutation::Unblock(state.username(user_id));
        state.mutations.push(mutation);
        Ok(())
    }
}

/// Directory tree from `(group, [user])` pairs; users carry
/// `loginDisabled=false`.
pub fn directory(groups: &[(&str, &[&str])]) -> DirectoryTree {
    let mut builder = DirectoryTree::builder();
    for (group, users) in groups {
        let group = DirectoryGroup::new(*group).unwrap();
        builder.group(group.clone());
        for user in *users {
            builder.member(
                group.clone(),
                DirectoryUser::with_cn(*user).with_attribute("loginDisabled", "false"),
            );
        }
    }
    builder.build()
}
