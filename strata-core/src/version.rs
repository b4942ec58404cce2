//! Append-only version history with movable named refs
//!
//! Every mutation to an item appends an immutable [`Version`] whose parents
//! point at the previous head. Symbolic refs (`latest`, `public`) each point
//! at exactly one version of a logical item at a time; moving a ref detaches
//! it from its previous holder. A version wrapping no value is a tombstone
//! recording deletion while keeping prior versions reachable by id.

use crate::id::VersionId;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Symbolic name pointing at exactly one version of an item at a time
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum Ref {
    Latest,
    Public,
    Custom(String),
}

impl Ref {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Latest => "latest",
            Self::Public => "public",
            Self::Custom(name) => name,
        }
    }
}

impl fmt::Display for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for Ref {
    fn from(name: String) -> Self {
        match name.as_str() {
            "latest" => Self::Latest,
            "public" => Self::Public,
            _ => Self::Custom(name),
        }
    }
}

impl From<Ref> for String {
    fn from(r: Ref) -> Self {
        r.as_str().to_string()
    }
}

impl FromStr for Ref {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::from(s.to_string()))
    }
}

/// Addressing mode for version lookups: an explicit version id or a ref
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VersionOrRef {
    Version(VersionId),
    Ref(Ref),
}

impl From<VersionId> for VersionOrRef {
    fn from(id: VersionId) -> Self {
        Self::Version(id)
    }
}

impl From<Ref> for VersionOrRef {
    fn from(r: Ref) -> Self {
        Self::Ref(r)
    }
}

/// An immutable snapshot of a value plus lineage and ref metadata
///
/// `value` is `None` for a tombstone version recording deletion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Version<T> {
    version: VersionId,
    parents: BTreeSet<VersionId>,
    refs: BTreeSet<Ref>,
    time: DateTime<Utc>,
    value: Option<T>,
}

impl<T> Version<T> {
    /// Create a new version wrapping a value
    pub fn new(value: T, parents: BTreeSet<VersionId>, refs: BTreeSet<Ref>) -> Self {
        Self {
            version: VersionId::new(),
            parents,
            refs,
            time: Utc::now(),
            value: Some(value),
        }
    }

    /// Create the first version of an item, holding the `latest` ref
    pub fn initial(value: T) -> Self {
        Self::new(
            value,
            BTreeSet::new(),
            BTreeSet::from([Ref::Latest]),
        )
    }

    /// Create a successor version of the given parent, taking over `latest`
    pub fn child(value: T, parent: VersionId) -> Self {
        Self::new(
            value,
            BTreeSet::from([parent]),
            BTreeSet::from([Ref::Latest]),
        )
    }

    /// Create a tombstone version recording deletion
    pub fn tombstone(parent: VersionId) -> Self {
        Self {
            version: VersionId::new(),
            parents: BTreeSet::from([parent]),
            refs: BTreeSet::from([Ref::Latest]),
            time: Utc::now(),
            value: None,
        }
    }

    /// Reassemble a version from stored parts
    pub fn from_parts(
        version: VersionId,
        parents: BTreeSet<VersionId>,
        refs: BTreeSet<Ref>,
        time: DateTime<Utc>,
        value: Option<T>,
    ) -> Self {
        Self {
            version,
            parents,
            refs,
            time,
            value,
        }
    }

    pub fn version(&self) -> VersionId {
        self.version
    }

    pub fn parents(&self) -> &BTreeSet<VersionId> {
        &self.parents
    }

    pub fn refs(&self) -> &BTreeSet<Ref> {
        &self.refs
    }

    pub fn time(&self) -> DateTime<Utc> {
        self.time
    }

    /// The wrapped value; `None` for a tombstone
    pub fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub fn into_value(self) -> Option<T> {
        self.value
    }

    pub fn is_tombstone(&self) -> bool {
        self.value.is_none()
    }

    pub fn has_ref(&self, r: &Ref) -> bool {
        self.refs.contains(r)
    }

    pub(crate) fn add_ref(&mut self, r: Ref) {
        self.refs.insert(r);
    }

    pub(crate) fn remove_ref(&mut self, r: &Ref) {
        self.refs.remove(r);
    }
}

/// The ordered set of all versions of one logical item
///
/// Versions are kept in creation-time ascending order; "current" is whichever
/// version holds the `latest` ref.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VersionedList<T>(Vec<Version<T>>);

impl<T> VersionedList<T> {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Build a list from stored versions, restoring time-ascending order
    pub fn from_versions(mut versions: Vec<Version<T>>) -> Self {
        versions.sort_by_key(|v| v.time());
        Self(versions)
    }

    pub fn versions(&self) -> &[Version<T>] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Look up a version by id
    pub fn version(&self, id: VersionId) -> Option<&Version<T>> {
        self.0.iter().find(|v| v.version() == id)
    }

    /// Look up the version currently holding a ref
    pub fn by_ref(&self, r: &Ref) -> Option<&Version<T>> {
        self.0.iter().find(|v| v.has_ref(r))
    }

    /// The version holding `latest`
    pub fn latest(&self) -> Option<&Version<T>> {
        self.by_ref(&Ref::Latest)
    }

    /// The version holding `public`
    pub fn public(&self) -> Option<&Version<T>> {
        self.by_ref(&Ref::Public)
    }

    /// Resolve either addressing mode, failing with `NotFound` on an absent
    /// ref or unknown version id
    pub fn get(&self, target: &VersionOrRef) -> Result<&Version<T>> {
        match target {
            VersionOrRef::Version(id) => self
                .version(*id)
                .ok_or_else(|| Error::not_found("Version", id.to_string())),
            VersionOrRef::Ref(r) => self
                .by_ref(r)
                .ok_or_else(|| Error::not_found("Ref", r.to_string())),
        }
    }

    /// Append a version, detaching any refs it carries from their previous
    /// holders so each ref has at most one holder.
    pub fn push(&mut self, version: Version<T>) {
        let incoming: Vec<Ref> = version.refs().iter().cloned().collect();
        for v in &mut self.0 {
            for r in &incoming {
                v.remove_ref(r);
            }
        }
        let at = self
            .0
            .iter()
            .position(|v| v.time() > version.time())
            .unwrap_or(self.0.len());
        self.0.insert(at, version);
    }

    /// Move a ref to the version with the given id, or detach it entirely
    /// when `to` is `None`. Fails with `NotFound` for an unknown target.
    pub fn update_ref(&mut self, r: &Ref, to: Option<VersionId>) -> Result<()> {
        if let Some(to) = to {
            if self.version(to).is_none() {
                return Err(Error::not_found("Version", to.to_string()));
            }
        }
        for v in &mut self.0 {
            v.remove_ref(r);
        }
        if let Some(to) = to {
            if let Some(v) = self.0.iter_mut().find(|v| v.version() == to) {
                v.add_ref(r.clone());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ref_string_roundtrip() {
        assert_eq!(Ref::from("latest".to_string()), Ref::Latest);
        assert_eq!(Ref::from("public".to_string()), Ref::Public);
        assert_eq!(
            Ref::from("staging".to_string()),
            Ref::Custom("staging".into())
        );
        assert_eq!(String::from(Ref::Latest), "latest");
    }

    #[test]
    fn test_initial_and_child_lineage() {
        let v1 = Version::initial("a");
        assert!(v1.parents().is_empty());
        assert!(v1.has_ref(&Ref::Latest));

        let v2 = Version::child("b", v1.version());
        assert_eq!(v2.parents().len(), 1);
        assert!(v2.parents().contains(&v1.version()));
    }

    #[test]
    fn test_push_moves_latest_atomically() {
        let v1 = Version::initial("a");
        let v1_id = v1.version();
        let mut list = VersionedList::new();
        list.push(v1);

        let v2 = Version::child("b", v1_id);
        let v2_id = v2.version();
        list.push(v2);

        // exactly one holder of latest
        let holders: Vec<_> = list
            .versions()
            .iter()
            .filter(|v| v.has_ref(&Ref::Latest))
            .collect();
        assert_eq!(holders.len(), 1);
        assert_eq!(holders[0].version(), v2_id);

        // previous version still reachable by id
        assert_eq!(list.version(v1_id).unwrap().value(), Some(&"a"));
    }

    #[test]
    fn test_update_ref_single_holder() {
        let v1 = Version::initial("a");
        let v1_id = v1.version();
        let mut list = VersionedList::new();
        list.push(v1);
        let v2 = Version::child("b", v1_id);
        let v2_id = v2.version();
        list.push(v2);

        list.update_ref(&Ref::Public, Some(v1_id)).unwrap();
        assert_eq!(list.public().unwrap().version(), v1_id);

        list.update_ref(&Ref::Public, Some(v2_id)).unwrap();
        assert_eq!(list.public().unwrap().version(), v2_id);
        assert!(!list.version(v1_id).unwrap().has_ref(&Ref::Public));

        list.update_ref(&Ref::Public, None).unwrap();
        assert!(list.public().is_none());

        let err = list.update_ref(&Ref::Public, Some(VersionId::new())).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_get_by_version_or_ref() {
        let v1 = Version::initial("a");
        let v1_id = v1.version();
        let mut list = VersionedList::new();
        list.push(v1);

        assert!(list.get(&VersionOrRef::Version(v1_id)).is_ok());
        assert!(list.get(&VersionOrRef::Ref(Ref::Latest)).is_ok());
        assert!(list.get(&VersionOrRef::Ref(Ref::Public)).is_err());
        assert!(list
            .get(&VersionOrRef::Version(VersionId::new()))
            .is_err());
    }

    #[test]
    fn test_tombstone() {
        let v1 = Version::initial("a");
        let v1_id = v1.version();
        let mut list = VersionedList::new();
        list.push(v1);

        let tomb: Version<&str> = Version::tombstone(v1_id);
        list.push(tomb);

        let latest = list.latest().unwrap();
        assert!(latest.is_tombstone());
        assert!(latest.value().is_none());
        assert_eq!(list.version(v1_id).unwrap().value(), Some(&"a"));
    }

    #[test]
    fn test_time_ascending_order() {
        use chrono::TimeZone;
        let t1 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let t2 = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let v1 = Version::from_parts(VersionId::new(), BTreeSet::new(), BTreeSet::new(), t1, Some("a"));
        let v2 = Version::from_parts(
            VersionId::new(),
            BTreeSet::from([v1.version()]),
            BTreeSet::new(),
            t2,
            Some("b"),
        );
        // feed out of order
        let list = VersionedList::from_versions(vec![v2.clone(), v1.clone()]);
        assert_eq!(list.versions()[0].version(), v1.version());
        assert_eq!(list.versions()[1].version(), v2.version());
    }
}
