//! Converging a server's live rotation onto a target rotation
//!
//! The command sequence is deliberately blunt: clear the live list, purge
//! every catalog map except the target's first, then add the rest of the
//! target in order. Any failure stops immediately. A half-applied change is
//! left as-is; the next run sees the drift and starts over.

use crate::client::{expect_success, Client};
use crate::config::Rotations;
use crate::error::{Error, Result};
use crate::policy::RotationMode;
use log::debug;
use shared::Command;
use std::collections::HashSet;
use tokio::io::{AsyncRead, AsyncWrite};

/// What a reconciliation pass did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    /// Live rotation already matched; nothing was sent
    Unchanged,
    Converged { deleted: usize, added: usize },
}

/// Cyclically shifts `rotation` by the server ordinal.
///
/// Servers sharing a template start at different maps. The shifted rotation
/// begins at index `len - (id % len)`, so ordinal 0 keeps the template as-is.
pub fn offset_rotation(rotation: &[String], id: usize) -> Result<Vec<String>> {
    if rotation.is_empty() {
        return Err(Error::EmptyRotation);
    }

    let start = rotation.len() - id % rotation.len();
    let mut shifted = rotation[start..].to_vec();
    shifted.extend_from_slice(&rotation[..start]);
    Ok(shifted)
}

/// Target rotation for server `id` in `mode`.
pub fn target_rotation(
    rotations: &Rotations,
    id: usize,
    mode: RotationMode,
) -> Result<Vec<String>> {
    offset_rotation(rotations.select(mode), id)
}

async fn delete_map<S>(client: &mut Client<S>, map: &str) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let outcome = client.rot_delete(map).await?;
    expect_success(Command::RotDel(map), outcome)
}

async fn add_map<S>(client: &mut Client<S>, map: &str) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let outcome = client.rot_add(map).await?;
    expect_success(Command::RotAdd(map), outcome)
}

/// Brings the server's rotation in line with `target`.
///
/// The target's first map is never deleted during the catalog purge, so it
/// anchors the new rotation and only the remaining maps are added.
pub async fn reconcile<S>(client: &mut Client<S>, target: &[String]) -> Result<Reconciliation>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (anchor, rest) = target.split_first().ok_or(Error::EmptyRotation)?;

    let live = client.rotation().await?;
    if live.as_slice() == target {
        debug!("Rotation already matches ({} maps)", live.len());
        return Ok(Reconciliation::Unchanged);
    }

    let mut deleted = 0;
    for map in &live {
        delete_map(client, map).await?;
        deleted += 1;
    }

    // Maps can linger server-side outside the rotlist view; delete everything
    // except the anchor. Maps already removed above are deleted again.
    let catalog = client.map_catalog().await?;
    let mut purged = HashSet::new();
    for map in catalog.iter().filter(|map| *map != anchor) {
        if purged.insert(map.as_str()) {
            delete_map(client, map).await?;
            deleted += 1;
        }
    }

    for map in rest {
        add_map(client, map).await?;
    }

    debug!("Rotation rebuilt: {} deletes, {} adds", deleted, rest.len());
    Ok(Reconciliation::Converged {
        deleted,
        added: rest.len(),
    })
}

/// Selects, offsets and applies the rotation for `mode`.
pub async fn swap_rotation<S>(
    client: &mut Client<S>,
    rotations: &Rotations,
    id: usize,
    mode: RotationMode,
) -> Result<Reconciliation>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let target = target_rotation(rotations, id, mode)?;
    reconcile(client, &target).await
}
