//! Marked code block extraction from Jupyter notebooks
//!
//! Reads an nbformat v4 document and concatenates the code cells between a
//! start marker and an end marker. Markers may sit in the middle of a cell;
//! only the text after the start marker and before the closing end marker is kept.

use serde::Deserialize;
use std::path::Path;

use crate::error::{EnergiError, Result};

/// Cell source is stored either as one string or as a list of lines
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum CellSource {
    Text(String),
    Lines(Vec<String>),
}

impl CellSource {
    fn into_text(self) -> String {
        match self {
            CellSource::Text(text) => text,
            CellSource::Lines(lines) => lines.concat(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Cell {
    cell_type: String,
    #[serde(default = "empty_source")]
    source: CellSource,
}

fn empty_source() -> CellSource {
    CellSource::Text(String::new())
}

#[derive(Debug, Deserialize)]
struct Notebook {
    cells: Vec<Cell>,
}

/// Extract the marked block from a notebook file
pub fn extract_marked_code(path: &Path, start_marker: &str, end_marker: &str) -> Result<String> {
    let text = std::fs::read_to_string(path).map_err(|e| EnergiError::Notebook {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let code = extract_marked_code_from_str(&text, start_marker, end_marker).map_err(|reason| {
        EnergiError::Notebook {
            path: path.to_path_buf(),
            reason,
        }
    })?;
    tracing::debug!(
        "Extracted {} bytes of code from {}",
        code.len(),
        path.display()
    );
    Ok(code)
}

/// Extract the marked block from notebook JSON text
///
/// Code cells are joined with a newline. The block closes in the first code
/// cell after the start marker that contains the end marker. Inside that cell
/// the text is cut at the last occurrence of the end marker, so a repeated
/// marker in the closing cell keeps everything before the final one. A later
/// start marker opens a new block.
pub fn extract_marked_code_from_str(
    notebook_json: &str,
    start_marker: &str,
    end_marker: &str,
) -> std::result::Result<String, String> {
    let notebook: Notebook =
        serde_json::from_str(notebook_json).map_err(|e| format!("invalid notebook JSON: {}", e))?;

    let mut blocks: Vec<String> = Vec::new();
    let mut extracting = false;
    let mut found_start = false;

    for cell in notebook.cells {
        if cell.cell_type != "code" {
            continue;
        }
        let mut source = cell.source.into_text();

        if let Some((_, after)) = source.split_once(start_marker) {
            source = after.to_string();
            extracting = true;
            found_start = true;
        }

        if !extracting {
            continue;
        }

        if let Some(end) = source.rfind(end_marker) {
            source.truncate(end);
            extracting = false;
        }
        blocks.push(source);
    }

    if !found_start {
        return Err(format!("start marker {:?} not found in any code cell", start_marker));
    }

    Ok(blocks.join("\n"))
}
