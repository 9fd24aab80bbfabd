//! Layered composition of repos.
//!
//! A [`ChainedRepo`] queries its members in order and answers from the first
//! one holding the key. When a read is satisfied by member *k*, the artifact
//! (or set) is promoted into every earlier member that is both writable and
//! opted in to `read_through_write`, so fast front layers fill from slow back
//! layers on demand. Members after *k* are never touched. A nested chain
//! passes the copy on to its own opted-in members only.
//!
//! Direct writes go to the caller-facing write target selected by
//! [`PutPolicy`], never to read-through-only layers.

use std::collections::BTreeSet;
use std::sync::Arc;

use prov_types::{Artifact, ArtifactSet, ContentId, Inputs};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{Capability, RepoError, RepoResult};
use crate::permissions::{Permissions, RepoPermissions};
use crate::traits::Repo;

/// Which members receive a direct `put`/`put_set`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PutPolicy {
    /// The first member that accepts writes.
    #[default]
    FirstWritable,
    /// Every member that accepts writes, in order.
    AllWritable,
}

/// Repos queried in priority order, with selective read-through-write.
pub struct ChainedRepo {
    name: String,
    permissions: Permissions,
    members: Vec<Arc<dyn Repo>>,
    put_policy: PutPolicy,
}

impl ChainedRepo {
    pub fn new(members: Vec<Arc<dyn Repo>>) -> Self {
        Self {
            name: "chained".into(),
            permissions: Permissions::new(RepoPermissions::all()),
            members,
            put_policy: PutPolicy::default(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_permissions(mut self, flags: RepoPermissions) -> Self {
        self.permissions = Permissions::new(flags);
        self
    }

    pub fn with_put_policy(mut self, put_policy: PutPolicy) -> Self {
        self.put_policy = put_policy;
        self
    }

    pub fn members(&self) -> &[Arc<dyn Repo>] {
        &self.members
    }

    pub fn put_policy(&self) -> PutPolicy {
        self.put_policy
    }

    /// Scan members in order; return the index of the first hit and its result.
    ///
    /// Not-found and permission errors move on to the next member. With no
    /// hit, the miss is reported if any member was readable, otherwise the
    /// last permission error.
    fn scan<T, R, M>(&self, mut read: R, miss: M) -> RepoResult<(usize, T)>
    where
        R: FnMut(&dyn Repo) -> RepoResult<T>,
        M: FnOnce() -> RepoError,
    {
        self.permissions.check(&self.name, Capability::Read)?;
        let mut missed: Option<RepoError> = None;
        let mut denied: Option<RepoError> = None;
        for (position, member) in self.members.iter().enumerate() {
            match read(member.as_ref()) {
                Ok(found) => return Ok((position, found)),
                Err(e) if e.is_not_found() => missed = Some(e),
                Err(e) if e.is_permission_denied() => {
                    debug!(repo = %self.name, member = %member.name(), "member not readable; skipping");
                    denied = Some(e);
                }
                Err(e) => return Err(e),
            }
        }
        Err(missed.or(denied).unwrap_or_else(miss))
    }

    /// Membership scan: `Ok(false)` on a miss, unless no member was readable.
    fn scan_contains<F>(&self, check: F) -> RepoResult<bool>
    where
        F: Fn(&dyn Repo) -> RepoResult<bool>,
    {
        self.permissions.check(&self.name, Capability::Read)?;
        let mut denied: Option<RepoError> = None;
        let mut readable = self.members.is_empty();
        for member in &self.members {
            match check(member.as_ref()) {
                Ok(true) => return Ok(true),
                Ok(false) => readable = true,
                Err(e) if e.is_permission_denied() => denied = Some(e),
                Err(e) => return Err(e),
            }
        }
        match denied {
            Some(e) if !readable => Err(e),
            _ => Ok(false),
        }
    }

    /// Offer a read-through copy to each of `members`; each one decides
    /// whether it takes it. Never fails the read.
    fn promote<P>(&self, members: &[Arc<dyn Repo>], id: &ContentId, put: P) -> bool
    where
        P: Fn(&dyn Repo) -> RepoResult<bool>,
    {
        let mut stored = false;
        for member in members {
            match put(member.as_ref()) {
                Ok(true) => {
                    stored = true;
                    debug!(repo = %self.name, member = %member.name(), id = %id.short(), "read-through write")
                }
                Ok(false) => {}
                Err(e) if e.is_key_exists() => {}
                Err(e) => warn!(
                    repo = %self.name,
                    member = %member.name(),
                    id = %id.short(),
                    error = %e,
                    "read-through write failed"
                ),
            }
        }
        stored
    }

    fn write_targets(&self) -> RepoResult<Vec<&Arc<dyn Repo>>> {
        self.permissions.check(&self.name, Capability::Write)?;
        let writable = self.members.iter().filter(|m| m.accepts_writes());
        let targets: Vec<_> = match self.put_policy {
            PutPolicy::FirstWritable => writable.take(1).collect(),
            PutPolicy::AllWritable => writable.collect(),
        };
        if targets.is_empty() {
            return Err(RepoError::permission_denied(&self.name, Capability::Write));
        }
        Ok(targets)
    }

    /// Remove from every member that holds the key.
    fn remove_everywhere<D, M>(&self, remove: D, miss: M) -> RepoResult<()>
    where
        D: Fn(&dyn Repo) -> RepoResult<()>,
        M: FnOnce() -> RepoError,
    {
        self.permissions.check(&self.name, Capability::Delete)?;
        let mut removed = false;
        let mut denied: Option<RepoError> = None;
        for member in &self.members {
            match remove(member.as_ref()) {
                Ok(()) => removed = true,
                Err(e) if e.is_not_found() => {}
                Err(e) if e.is_permission_denied() => denied = Some(e),
                Err(e) => return Err(e),
            }
        }
        if removed {
            Ok(())
        } else {
            Err(denied.unwrap_or_else(miss))
        }
    }

    /// Sorted union of ids across readable members.
    fn union_ids<F>(&self, list: F) -> RepoResult<Vec<ContentId>>
    where
        F: Fn(&dyn Repo) -> RepoResult<Vec<ContentId>>,
    {
        self.permissions.check(&self.name, Capability::Read)?;
        let mut ids = BTreeSet::new();
        let mut denied: Option<RepoError> = None;
        let mut readable = self.members.is_empty();
        for member in &self.members {
            match list(member.as_ref()) {
                Ok(found) => {
                    readable = true;
                    ids.extend(found);
                }
                Err(e) if e.is_permission_denied() => denied = Some(e),
                Err(e) => return Err(e),
            }
        }
        match denied {
            Some(e) if !readable => Err(e),
            _ => Ok(ids.into_iter().collect()),
        }
    }
}

impl std::fmt::Debug for ChainedRepo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let members: Vec<&str> = self.members.iter().map(|m| m.name()).collect();
        f.debug_struct("ChainedRepo")
            .field("name", &self.name)
            .field("members", &members)
            .field("put_policy", &self.put_policy)
            .finish()
    }
}

impl Repo for ChainedRepo {
    fn name(&self) -> &str {
        &self.name
    }

    fn permissions(&self) -> &Permissions {
        &self.permissions
    }

    fn contains(&self, id: &ContentId) -> RepoResult<bool> {
        self.scan_contains(|member| member.contains(id))
    }

    fn put(&self, artifact: &Artifact) -> RepoResult<()> {
        for target in self.write_targets()? {
            target.put(artifact)?;
        }
        Ok(())
    }

    /// A nested chain with no writable member is skipped by its parent.
    fn accepts_writes(&self) -> bool {
        self.permissions.can_write() && self.members.iter().any(|m| m.accepts_writes())
    }

    fn put_read_through(&self, artifact: &Artifact) -> RepoResult<bool> {
        if !self.permissions.accepts_read_through() {
            return Ok(false);
        }
        Ok(self.promote(&self.members, &artifact.id, |member| {
            member.put_read_through(artifact)
        }))
    }

    fn get_by_id(&self, id: &ContentId) -> RepoResult<Artifact> {
        let (hit, artifact) = self.scan(
            |member| member.get_by_id(id),
            || RepoError::ArtifactNotFound(id.clone()),
        )?;
        self.promote(&self.members[..hit], &artifact.id, |member| {
            member.put_read_through(&artifact)
        });
        Ok(artifact)
    }

    fn get_by_value_id(&self, value_id: &ContentId) -> RepoResult<Artifact> {
        let (hit, artifact) = self.scan(
            |member| member.get_by_value_id(value_id),
            || RepoError::ValueNotFound(value_id.clone()),
        )?;
        self.promote(&self.members[..hit], &artifact.id, |member| {
            member.put_read_through(&artifact)
        });
        Ok(artifact)
    }

    fn get_value(&self, id: &ContentId) -> RepoResult<Value> {
        self.scan(
            |member| member.get_value(id),
            || RepoError::ArtifactNotFound(id.clone()),
        )
        .map(|(_, value)| value)
    }

    fn get_inputs(&self, id: &ContentId) -> RepoResult<Inputs> {
        self.scan(
            |member| member.get_inputs(id),
            || RepoError::ArtifactNotFound(id.clone()),
        )
        .map(|(_, inputs)| inputs)
    }

    fn delete(&self, id: &ContentId) -> RepoResult<()> {
        self.remove_everywhere(
            |member| member.delete(id),
            || RepoError::ArtifactNotFound(id.clone()),
        )
    }

    fn artifact_ids(&self) -> RepoResult<Vec<ContentId>> {
        self.union_ids(|member| member.artifact_ids())
    }

    fn put_set(&self, set: &ArtifactSet) -> RepoResult<()> {
        for target in self.write_targets()? {
            target.put_set(set)?;
        }
        Ok(())
    }

    fn put_set_read_through(&self, set: &ArtifactSet) -> RepoResult<bool> {
        if !self.permissions.accepts_read_through() {
            return Ok(false);
        }
        Ok(self.promote(&self.members, &set.id, |member| {
            member.put_set_read_through(set)
        }))
    }

    fn get_set_by_id(&self, id: &ContentId) -> RepoResult<ArtifactSet> {
        let (hit, set) = self.scan(
            |member| member.get_set_by_id(id),
            || RepoError::SetNotFound(id.clone()),
        )?;
        self.promote(&self.members[..hit], &set.id, |member| {
            member.put_set_read_through(&set)
        });
        Ok(set)
    }

    fn get_set_by_name(&self, name: &str) -> RepoResult<ArtifactSet> {
        let (hit, set) = self.scan(
            |member| member.get_set_by_name(name),
            || RepoError::SetNameNotFound(name.to_string()),
        )?;
        self.promote(&self.members[..hit], &set.id, |member| {
            member.put_set_read_through(&set)
        });
        Ok(set)
    }

    fn contains_set(&self, id: &ContentId) -> RepoResult<bool> {
        self.scan_contains(|member| member.contains_set(id))
    }

    fn delete_set(&self, id: &ContentId) -> RepoResult<()> {
        self.remove_everywhere(
            |member| member.delete_set(id),
            || RepoError::SetNotFound(id.clone()),
        )
    }

    fn set_ids(&self) -> RepoResult<Vec<ContentId>> {
        self.union_ids(|member| member.set_ids())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::tests::artifact;
    use crate::memory::MemoryRepo;
    use serde_json::json;
    use std::sync::Barrier;
    use std::thread;

    fn memory(name: &str, flags: RepoPermissions) -> Arc<MemoryRepo> {
        Arc::new(MemoryRepo::new().with_name(name).with_permissions(flags))
    }

    fn seeded(name: &str, flags: RepoPermissions, artifacts: Vec<Artifact>) -> Arc<MemoryRepo> {
        Arc::new(
            MemoryRepo::new()
                .with_name(name)
                .with_permissions(flags)
                .with_artifacts(artifacts)
                .unwrap(),
        )
    }

    fn chain(members: &[Arc<MemoryRepo>]) -> ChainedRepo {
        ChainedRepo::new(
            members
                .iter()
                .map(|m| Arc::clone(m) as Arc<dyn Repo>)
                .collect(),
        )
    }

    // ---- precedence ----

    #[test]
    fn reads_from_read_only_layer_and_writes_past_it() {
        let foo = artifact("foo");
        let read_only = seeded(
            "read-only",
            RepoPermissions::all().with_write(false).with_delete(false),
            vec![foo.clone()],
        );
        let writable = memory("writable", RepoPermissions::all().with_delete(false));
        let chained = chain(&[read_only.clone(), writable.clone()]);

        assert!(chained.contains(&foo.id).unwrap());

        let bar = artifact("bar");
        chained.put(&bar).unwrap();
        assert!(chained.contains(&bar.id).unwrap());
        assert!(writable.contains(&bar.id).unwrap());
        assert!(!read_only.contains(&bar.id).unwrap());

        assert_eq!(chained.get_by_value_id(&bar.value_id).unwrap().id, bar.id);
        assert_eq!(chained.get_by_id(&bar.id).unwrap().id, bar.id);
        assert_eq!(chained.get_value(&bar.id).unwrap(), bar.value);
        assert_eq!(chained.get_inputs(&bar.id).unwrap(), bar.inputs);
    }

    #[test]
    fn earliest_member_wins() {
        let front = memory("front", RepoPermissions::all());
        let back = memory("back", RepoPermissions::all());
        let shared = artifact("shared");
        let mut stale = shared.clone();
        stale.value = json!("stale");
        front.put(&shared).unwrap();
        back.put(&stale).unwrap();

        let chained = chain(&[front, back]);
        assert_eq!(chained.get_by_id(&shared.id).unwrap(), shared);
        assert_eq!(chained.get_value(&shared.id).unwrap(), shared.value);
    }

    // ---- read-through-write ----

    #[test]
    fn read_through_write_is_selective() {
        let foo = artifact("foo");
        let no_promote = memory("no-promote", RepoPermissions::all().with_read_through_write(false));
        let promote = memory("promote", RepoPermissions::all());
        let source = seeded("source", RepoPermissions::all().with_write(false), vec![foo.clone()]);
        let ahead = memory("ahead", RepoPermissions::all());
        let chained = chain(&[no_promote.clone(), promote.clone(), source, ahead.clone()]);

        assert!(!promote.contains(&foo.id).unwrap());
        assert_eq!(chained.get_by_id(&foo.id).unwrap().id, foo.id);

        assert!(promote.contains(&foo.id).unwrap());
        assert!(!no_promote.contains(&foo.id).unwrap());
        assert!(!ahead.contains(&foo.id).unwrap());
    }

    #[test]
    fn promotion_requires_write_flag() {
        let foo = artifact("foo");
        let scratch = memory("scratch", RepoPermissions::all().with_read_through_write(false));
        let rtw_only = memory(
            "rtw-only",
            RepoPermissions::all().with_write(false).with_read_through_write(true),
        );
        let source = seeded("source", RepoPermissions::read_only(), vec![foo.clone()]);
        let chained = chain(&[scratch.clone(), rtw_only.clone(), source]);

        assert_eq!(chained.get_by_id(&foo.id).unwrap().id, foo.id);
        assert!(!rtw_only.contains(&foo.id).unwrap());
        assert!(!scratch.contains(&foo.id).unwrap());

        let bar = artifact("bar");
        chained.put(&bar).unwrap();
        assert!(scratch.contains(&bar.id).unwrap());
        assert!(!rtw_only.contains(&bar.id).unwrap());
    }

    #[test]
    fn get_by_value_id_promotes() {
        let foo = artifact("foo");
        let front = memory("front", RepoPermissions::all());
        let source = seeded("source", RepoPermissions::read_only(), vec![foo.clone()]);
        let chained = chain(&[front.clone(), source]);

        assert_eq!(chained.get_by_value_id(&foo.value_id).unwrap().id, foo.id);
        assert_eq!(front.get_by_id(&foo.id).unwrap(), foo);
    }

    #[test]
    fn value_reads_do_not_promote() {
        let foo = artifact("foo");
        let front = memory("front", RepoPermissions::all());
        let source = seeded("source", RepoPermissions::read_only(), vec![foo.clone()]);
        let chained = chain(&[front.clone(), source]);

        assert_eq!(chained.get_value(&foo.id).unwrap(), foo.value);
        assert!(chained.contains(&foo.id).unwrap());
        assert!(!front.contains(&foo.id).unwrap());
    }

    #[test]
    fn sets_are_promoted() {
        let front = memory("front", RepoPermissions::all());
        let back = memory("back", RepoPermissions::all());
        let set = ArtifactSet::named(["a", "b"], "batch");
        back.put_set(&set).unwrap();
        let chained = chain(&[front.clone(), back]);

        assert_eq!(chained.get_set_by_name("batch").unwrap(), set);
        assert_eq!(front.get_set_by_id(&set.id).unwrap(), set);
        assert!(chained.contains_set(&set.id).unwrap());
    }

    #[test]
    fn concurrent_promotions_do_not_fail_reads() {
        let foo = artifact("foo");
        let front = memory("front", RepoPermissions::all());
        let source = seeded("source", RepoPermissions::read_only(), vec![foo.clone()]);
        let chained = Arc::new(chain(&[front.clone(), source]));
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let chained = Arc::clone(&chained);
                let barrier = Arc::clone(&barrier);
                let id = foo.id.clone();
                thread::spawn(move || {
                    barrier.wait();
                    chained.get_by_id(&id)
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap().unwrap().id, foo.id);
        }
        assert!(front.contains(&foo.id).unwrap());
    }

    #[test]
    fn direct_duplicate_put_still_fails() {
        let front = memory("front", RepoPermissions::all());
        let chained = chain(&[front]);
        let a = artifact("dup");
        chained.put(&a).unwrap();
        assert!(chained.put(&a).unwrap_err().is_key_exists());
    }

    // ---- error surfacing ----

    #[test]
    fn unreadable_members_are_skipped() {
        let foo = artifact("foo");
        let hidden = memory("hidden", RepoPermissions::all().with_read(false));
        let source = seeded("source", RepoPermissions::read_only(), vec![foo.clone()]);
        let chained = chain(&[hidden, source]);
        assert_eq!(chained.get_by_id(&foo.id).unwrap(), foo);
    }

    #[test]
    fn miss_beats_permission_error_when_something_was_readable() {
        let hidden = memory("hidden", RepoPermissions::all().with_read(false));
        let open = memory("open", RepoPermissions::all());
        let chained = chain(&[hidden, open]);
        let missing = ContentId::new("missing");
        assert!(chained.get_by_id(&missing).unwrap_err().is_not_found());
        assert!(!chained.contains(&missing).unwrap());
    }

    #[test]
    fn all_unreadable_surfaces_permission_error() {
        let hidden = memory("hidden", RepoPermissions::all().with_read(false));
        let chained = chain(&[hidden]);
        let missing = ContentId::new("missing");
        assert!(chained.get_by_id(&missing).unwrap_err().is_permission_denied());
        assert!(chained.contains(&missing).unwrap_err().is_permission_denied());
        assert!(chained.artifact_ids().unwrap_err().is_permission_denied());
    }

    #[test]
    fn chain_flags_gate_before_fanning_out() {
        let foo = artifact("foo");
        let source = seeded("source", RepoPermissions::all(), vec![foo.clone()]);
        let chained = chain(&[source]).with_permissions(RepoPermissions::read_only());
        assert!(chained.put(&artifact("bar")).unwrap_err().is_permission_denied());
        assert!(chained.delete(&foo.id).unwrap_err().is_permission_denied());

        chained.permissions().set_read(false);
        assert!(chained.get_by_id(&foo.id).unwrap_err().is_permission_denied());
    }

    // ---- empty chain ----

    #[test]
    fn empty_chain_misses_and_rejects_writes() {
        let chained = ChainedRepo::new(Vec::new());
        let id = ContentId::new("anything");
        assert!(!chained.contains(&id).unwrap());
        assert!(chained.get_by_id(&id).unwrap_err().is_not_found());
        assert!(chained.get_set_by_name("x").unwrap_err().is_not_found());
        assert!(chained.artifact_ids().unwrap().is_empty());
        assert!(chained.put(&artifact("x")).unwrap_err().is_permission_denied());
        assert!(chained.put_set(&ArtifactSet::new(["a"])).unwrap_err().is_permission_denied());
        assert!(chained.delete(&id).unwrap_err().is_not_found());
    }

    // ---- put policy and delete ----

    #[test]
    fn all_writable_policy_writes_every_writable_member() {
        let first = memory("first", RepoPermissions::all());
        let read_only = memory("ro", RepoPermissions::read_only());
        let second = memory("second", RepoPermissions::all());
        let chained = chain(&[first.clone(), read_only.clone(), second.clone()])
            .with_put_policy(PutPolicy::AllWritable);

        let a = artifact("fanout");
        chained.put(&a).unwrap();
        assert!(first.contains(&a.id).unwrap());
        assert!(second.contains(&a.id).unwrap());
        assert!(!read_only.contains(&a.id).unwrap());
    }

    #[test]
    fn no_writable_member_is_permission_denied() {
        let read_only = memory("ro", RepoPermissions::read_only());
        let chained = chain(&[read_only]);
        let err = chained.put(&artifact("x")).unwrap_err();
        assert!(matches!(
            err,
            RepoError::PermissionDenied { ref repo, capability: Capability::Write } if repo == "chained"
        ));
    }

    #[test]
    fn delete_removes_from_every_holder() {
        let a = artifact("everywhere");
        let front = seeded("front", RepoPermissions::all(), vec![a.clone()]);
        let back = seeded("back", RepoPermissions::all(), vec![a.clone()]);
        let chained = chain(&[front.clone(), back.clone()]);

        chained.delete(&a.id).unwrap();
        assert!(!front.contains(&a.id).unwrap());
        assert!(!back.contains(&a.id).unwrap());
        assert!(chained.delete(&a.id).unwrap_err().is_not_found());
    }

    #[test]
    fn delete_held_only_by_undeletable_member_is_denied() {
        let a = artifact("pinned");
        let pinned = seeded("pinned", RepoPermissions::read_only(), vec![a.clone()]);
        let chained = chain(&[pinned.clone()]);
        assert!(chained.delete(&a.id).unwrap_err().is_permission_denied());
        assert!(pinned.contains(&a.id).unwrap());
    }

    #[test]
    fn nested_chains_compose() {
        let foo = artifact("foo");
        let inner_front = memory("inner-front", RepoPermissions::all());
        let source = seeded("source", RepoPermissions::read_only(), vec![foo.clone()]);
        let inner: Arc<dyn Repo> = Arc::new(chain(&[inner_front.clone(), source]).with_name("inner"));
        let outer_front: Arc<dyn Repo> = memory("outer-front", RepoPermissions::all());
        let outer = ChainedRepo::new(vec![outer_front.clone(), inner]);

        assert_eq!(outer.get_by_id(&foo.id).unwrap().id, foo.id);
        assert!(outer_front.contains(&foo.id).unwrap());
        assert!(inner_front.contains(&foo.id).unwrap());
    }

    #[test]
    fn nested_chain_promotes_only_into_opted_in_members() {
        let foo = artifact("foo");
        let scratch = memory("scratch", RepoPermissions::all().with_read_through_write(false));
        let cache = memory("cache", RepoPermissions::all());
        let inner: Arc<dyn Repo> = Arc::new(chain(&[scratch.clone(), cache.clone()]).with_name("inner"));
        let source: Arc<dyn Repo> = seeded("source", RepoPermissions::read_only(), vec![foo.clone()]);
        let outer = ChainedRepo::new(vec![inner, source]);

        assert_eq!(outer.get_by_id(&foo.id).unwrap().id, foo.id);
        assert!(!scratch.contains(&foo.id).unwrap());
        assert!(cache.contains(&foo.id).unwrap());

        let set = ArtifactSet::named([foo.id.clone()], "batch");
        let set_source: Arc<dyn Repo> = memory("set-source", RepoPermissions::all());
        set_source.put_set(&set).unwrap();
        let inner: Arc<dyn Repo> = Arc::new(chain(&[scratch.clone()]).with_name("inner"));
        let outer = ChainedRepo::new(vec![inner, set_source]);
        assert_eq!(outer.get_set_by_name("batch").unwrap(), set);
        assert!(!scratch.contains_set(&set.id).unwrap());
    }

    #[test]
    fn nested_chain_flags_can_opt_out_of_promotion() {
        let foo = artifact("foo");
        let cache = memory("cache", RepoPermissions::all());
        let inner: Arc<dyn Repo> = Arc::new(
            chain(&[cache.clone()])
                .with_name("inner")
                .with_permissions(RepoPermissions::all().with_read_through_write(false)),
        );
        let source: Arc<dyn Repo> = seeded("source", RepoPermissions::read_only(), vec![foo.clone()]);
        let outer = ChainedRepo::new(vec![inner, source]);

        assert_eq!(outer.get_by_id(&foo.id).unwrap().id, foo.id);
        assert!(!cache.contains(&foo.id).unwrap());
    }

    #[test]
    fn put_skips_nested_chain_without_writable_member() {
        let read_only = memory("ro", RepoPermissions::read_only());
        let inner = Arc::new(chain(&[read_only.clone()]).with_name("inner"));
        assert!(!inner.accepts_writes());
        let writable = memory("writable", RepoPermissions::all());
        let outer = ChainedRepo::new(vec![inner as Arc<dyn Repo>, writable.clone() as Arc<dyn Repo>]);

        let bar = artifact("bar");
        outer.put(&bar).unwrap();
        assert!(writable.contains(&bar.id).unwrap());
        assert!(!read_only.contains(&bar.id).unwrap());

        let set = ArtifactSet::named([bar.id.clone()], "batch");
        outer.put_set(&set).unwrap();
        assert!(writable.contains_set(&set.id).unwrap());
    }
}
