//! Subject duplicate merging
//!
//! Free-text subject entry accumulates rows that differ only in case or
//! surrounding whitespace. Duplicates merge into the lowest-id (oldest)
//! row; every referencing record is repointed before the losers are
//! deleted.

use atms_common::db::models::Subject;
use atms_common::Result;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

/// Planned merge of one duplicate group into its canonical subject
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubjectMerge {
    pub canonical_id: i64,
    /// Display name of the surviving row
    pub canonical_name: String,
    /// Uppercased, trimmed name shared by the whole group
    pub normalized_name: String,
    pub duplicate_ids: Vec<i64>,
}

/// Counters from an apply step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MergeOutcome {
    pub subjects_deleted: usize,
    pub sessions_repointed: u64,
    pub staff_links_repointed: u64,
    pub staff_texts_rewritten: u64,
}

/// Case- and whitespace-insensitive canonical form of a subject name
pub fn normalize_name(name: &str) -> String {
    name.trim().to_uppercase()
}

/// Group subjects by normalized name and plan one merge per group with
/// more than one member. Pure; deterministic output order.
pub fn plan_merges(subjects: &[Subject]) -> Vec<SubjectMerge> {
    let mut groups: BTreeMap<String, Vec<&Subject>> = BTreeMap::new();
    for subject in subjects {
        groups.entry(normalize_name(&subject.name)).or_default().push(subject);
    }

    let mut merges = Vec::new();
    for (normalized_name, mut group) in groups {
        if group.len() < 2 {
            continue;
        }
        group.sort_by_key(|s| s.id);
        let canonical = group[0];
        merges.push(SubjectMerge {
            canonical_id: canonical.id,
            canonical_name: canonical.name.clone(),
            normalized_name,
            duplicate_ids: group[1..].iter().map(|s| s.id).collect(),
        });
    }
    merges
}

/// Repoint sessions, staff join rows, and legacy free-text fields to the
/// canonical subject, then delete the duplicate rows. One audit log line
/// per repointed duplicate.
pub async fn apply_merges(
    conn: &mut sqlx::SqliteConnection,
    merges: &[SubjectMerge],
) -> Result<MergeOutcome> {
    let mut outcome = MergeOutcome::default();

    for merge in merges {
        for &duplicate_id in &merge.duplicate_ids {
            let sessions = crate::db::subjects::repoint_sessions(
                &mut *conn,
                duplicate_id,
                merge.canonical_id,
            )
            .await?;
            let links =
                crate::db::subjects::repoint_staff_links(conn, duplicate_id, merge.canonical_id)
                    .await?;
            crate::db::subjects::delete(&mut *conn, duplicate_id).await?;

            outcome.subjects_deleted += 1;
            outcome.sessions_repointed += sessions;
            outcome.staff_links_repointed += links;

            info!(
                entity = "subject",
                id = duplicate_id,
                field = "merged_into",
                old = duplicate_id,
                new = merge.canonical_id,
                sessions_repointed = sessions,
                staff_links_repointed = links,
                "Merged duplicate subject"
            );
        }

        outcome.staff_texts_rewritten += crate::db::staff::rewrite_subject_text(
            &mut *conn,
            &merge.normalized_name,
            &merge.canonical_name,
        )
        .await?;
    }

    Ok(outcome)
}
