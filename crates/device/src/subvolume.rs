use std::cmp::Ordering;
use std::path::PathBuf;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::partition::PartitionTable;

/// A Btrfs subvolume, as reported by the subvolume adapter.
///
/// Block devices and subvolumes are immutable after construction; fields
/// gained over the run (partition table, snapshot set) are attached through
/// [`SubvolumeBuilder`], which finalizes back to an immutable `Subvolume`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subvolume {
    pub filesystem_path: PathBuf,
    pub logical_path: String,
    pub time_created: DateTime<Local>,
    pub uuid: Uuid,
    pub parent_uuid: Uuid,
    pub num_id: u64,
    pub parent_num_id: u64,
    pub is_read_only: bool,
    pub created_from: Option<Box<Subvolume>>,
    pub static_partition_table: Option<PartitionTable>,
    pub snapshots: Option<Vec<Subvolume>>,
}

impl Subvolume {
    /// A subvolume is a snapshot iff its parent uuid is not the nil UUID.
    pub fn is_snapshot(&self) -> bool {
        self.parent_uuid != Uuid::nil()
    }

    pub fn is_writable(&self) -> bool {
        !self.is_read_only
    }

    /// True when this subvolume was produced by a promotion/clone this run.
    pub fn is_freshly_created(&self) -> bool {
        self.created_from.is_some()
    }

    /// The time used for ordering: the creation time of the subvolume this
    /// was produced from, if any, else this subvolume's own creation time.
    fn sort_key(&self) -> DateTime<Local> {
        match &self.created_from {
            Some(source) => source.time_created,
            None => self.time_created,
        }
    }

    /// `{ro|rw}{subvol|snap}_YYYY-MM-DD_HH-MM-SS_ID{num}`
    pub fn derived_name(&self) -> String {
        Self::format_derived_name(self.is_read_only, self.is_snapshot(), self.time_created, self.num_id)
    }

    /// The name a writable clone of this (read-only) subvolume is given: its
    /// own timestamp, kind, and id, with `rw` in place of `ro`. Computed
    /// before the clone exists, so the destination path is known up front
    /// rather than assigned after the fact from the clone's own (freshly
    /// allocated) id.
    pub fn derived_clone_name(&self) -> String {
        Self::format_derived_name(false, self.is_snapshot(), self.time_created, self.num_id)
    }

    fn format_derived_name(
        is_read_only: bool,
        is_snapshot: bool,
        time_created: DateTime<Local>,
        num_id: u64,
    ) -> String {
        let ro_rw = if is_read_only { "ro" } else { "rw" };
        let kind = if is_snapshot { "snap" } else { "subvol" };
        let timestamp = time_created.format("%Y-%m-%d_%H-%M-%S");

        format!("{}{}_{}_ID{}", ro_rw, kind, timestamp, num_id)
    }

    pub fn builder(self) -> SubvolumeBuilder {
        SubvolumeBuilder { subvolume: self }
    }
}

impl PartialEq for Subvolume {
    fn eq(&self, other: &Self) -> bool {
        self.uuid == other.uuid
    }
}

impl Eq for Subvolume {}

impl PartialOrd for Subvolume {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Subvolume {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

/// Staged builder that attaches fields gained during phases 2/4/5 without
/// mutating the original value.
pub struct SubvolumeBuilder {
    subvolume: Subvolume,
}

impl SubvolumeBuilder {
    pub fn with_static_partition_table(mut self, table: PartitionTable) -> Self {
        self.subvolume.static_partition_table = Some(table);
        self
    }

    pub fn with_snapshots(mut self, snapshots: Vec<Subvolume>) -> Self {
        self.subvolume.snapshots = Some(snapshots);
        self
    }

    pub fn with_created_from(mut self, source: Subvolume) -> Self {
        self.subvolume.created_from = Some(Box::new(source));
        self
    }

    pub fn build(self) -> Subvolume {
        self.subvolume
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn subvol(uuid: Uuid, time: DateTime<Local>, read_only: bool, snapshot: bool) -> Subvolume {
        Subvolume {
            filesystem_path: PathBuf::from("/mnt/@"),
            logical_path: "@".to_string(),
            time_created: time,
            uuid,
            parent_uuid: if snapshot { Uuid::new_v4() } else { Uuid::nil() },
            num_id: 256,
            parent_num_id: 5,
            is_read_only: read_only,
            created_from: None,
            static_partition_table: None,
            snapshots: None,
        }
    }

    #[test]
    fn equality_is_by_uuid() {
        let uuid = Uuid::new_v4();
        let t1 = Local.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
        let t2 = Local.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        let a = subvol(uuid, t1, false, false);
        let b = subvol(uuid, t2, true, true);

        assert_eq!(a, b);
    }

    #[test]
    fn ordering_prefers_created_from_time() {
        let early = Local.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let late = Local.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        let source = subvol(Uuid::new_v4(), early, true, true);
        let clone = subvol(Uuid::new_v4(), late, false, true)
            .builder()
            .with_created_from(source.clone())
            .build();

        let newer_unrelated = subvol(Uuid::new_v4(), late, false, true);

        assert!(clone < newer_unrelated);
    }

    #[test]
    fn derived_name_matches_pattern() {
        let time = Local.with_ymd_and_hms(2023, 6, 15, 10, 30, 0).unwrap();
        let s = subvol(Uuid::new_v4(), time, false, true);
        assert_eq!(s.derived_name(), "rwsnap_2023-06-15_10-30-00_ID256");
    }

    #[test]
    fn derived_clone_name_uses_rw_with_the_source_timestamp_and_id() {
        let time = Local.with_ymd_and_hms(2023, 6, 15, 10, 30, 0).unwrap();
        let source = subvol(Uuid::new_v4(), time, true, true);
        assert_eq!(source.derived_name(), "rosnap_2023-06-15_10-30-00_ID256");
        assert_eq!(
            source.derived_clone_name(),
            "rwsnap_2023-06-15_10-30-00_ID256"
        );
    }
}
