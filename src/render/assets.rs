//! Writing extracted images next to the JSON output.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::model::{Content, HierarchicalDocument};

/// Write every image with data to `dir` and record its path on the element.
///
/// Files are named `page_{n}_img_{k}.{ext}`, numbered per page in reading
/// order. Returns the written paths.
pub fn export_assets(doc: &mut HierarchicalDocument, dir: &Path) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();

    for page in &mut doc.pages {
        let mut index = 0;
        for element in &mut page.elements {
            let Content::Image(image) = &mut element.content else {
                continue;
            };
            if image.data.is_empty() {
                continue;
            }
            if written.is_empty() {
                fs::create_dir_all(dir)?;
            }

            index += 1;
            let path = dir.join(format!("page_{}_img_{}.{}", page.page_number, index, image.extension()));
            fs::write(&path, &image.data)?;
            image.path = Some(path.to_string_lossy().to_string());
            log::debug!("Wrote {}", path.display());
            written.push(path);
        }
    }

    Ok(written)
}
