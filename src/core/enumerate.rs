use crate::domain::model::{DatasetHandle, TargetId};
use crate::domain::ports::ArchiveClient;
use crate::utils::error::{Result, VizError};

/// Ordered dataset handles for `target`. An empty list is reported, not an error.
pub async fn enumerate<A: ArchiveClient + ?Sized>(
    archive: &A,
    target: &TargetId,
) -> Result<Vec<DatasetHandle>> {
    tracing::debug!("Searching archive for {}", target);
    let handles = archive.search(target).await?;

    if handles.is_empty() {
        tracing::warn!("No datasets found for {}.", target);
    } else {
        tracing::info!("🔭 Found {} datasets for {}", handles.len(), target);
        for (i, handle) in handles.iter().enumerate() {
            tracing::debug!("  #{}: {}", i + 1, handle);
        }
    }

    Ok(handles)
}

/// Handle at a 1-based `index`.
pub fn select(handles: &[DatasetHandle], index: usize) -> Result<&DatasetHandle> {
    index
        .checked_sub(1)
        .and_then(|i| handles.get(i))
        .ok_or(VizError::IndexOutOfRange {
            index,
            count: handles.len(),
        })
}
