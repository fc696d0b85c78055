use thiserror::Error;

use crate::geometry::{IVec2, Rect, Size};

use super::object::ObjectId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BucketingError {
    #[error("cannot bucket an empty object set")]
    EmptyInput,
    #[error("tile size must be non-zero, got {}x{}", .0.w, .0.h)]
    ZeroTileSize(Size),
    #[error("object {0:?} has a zero-area rect and can never be assigned")]
    DegenerateRect(ObjectId),
    #[error("sweep left the bounding region with {remaining} objects unassigned")]
    SweepExhausted { remaining: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkCell {
    pub rect: Rect,
    pub members: Vec<ObjectId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkLayout {
    /// Top-left of the union of all input rects; anchors the tile grid.
    pub content_origin: IVec2,
    pub cells: Vec<ChunkCell>,
}

/// Partitions objects into grid-aligned cells of `tile` size with a
/// row-major sweep starting at the union's top-left.
///
/// An object straddling several cells lands in the first cell the sweep
/// reaches, not the one it overlaps most.
pub fn bucket_objects(
    objects: &[(ObjectId, Rect)],
    tile: Size,
) -> Result<ChunkLayout, BucketingError> {
    if tile.is_empty() {
        return Err(BucketingError::ZeroTileSize(tile));
    }
    let Some((first_id, first_rect)) = objects.first().copied() else {
        return Err(BucketingError::EmptyInput);
    };
    if let Some((id, _)) = objects.iter().find(|(_, rect)| !rect.has_area()) {
        return Err(BucketingError::DegenerateRect(*id));
    }

    if objects.len() == 1 {
        let origin = first_rect.top_left();
        return Ok(ChunkLayout {
            content_origin: origin,
            cells: vec![ChunkCell {
                rect: Rect::from_origin(origin, tile),
                members: vec![first_id],
            }],
        });
    }

    let bounds = objects
        .iter()
        .skip(1)
        .fold(first_rect, |acc, (_, rect)| acc.union(rect));
    let content_origin = bounds.top_left();

    let mut unassigned: Vec<(ObjectId, Rect)> = objects.to_vec();
    let mut cells = Vec::new();
    let mut scan = Rect::from_origin(content_origin, tile);

    loop {
        let mut members = Vec::new();
        unassigned.retain(|(id, rect)| {
            if rect.intersects(&scan) {
                members.push(*id);
                false
            } else {
                true
            }
        });
        if !members.is_empty() {
            cells.push(ChunkCell { rect: scan, members });
        }

        if unassigned.is_empty() {
            break;
        }

        scan.x += tile.w as i32;
        if scan.x >= bounds.right() {
            scan.x = bounds.x;
            scan.y += tile.h as i32;
        }
        if scan.y >= bounds.bottom() {
            return Err(BucketingError::SweepExhausted {
                remaining: unassigned.len(),
            });
        }
    }

    Ok(ChunkLayout {
        content_origin,
        cells,
    })
}
