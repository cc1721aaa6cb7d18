//! PDF merging functionality using lopdf

use std::collections::BTreeMap;
use std::path::PathBuf;

use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::debug;

use crate::error::{Error, Result};

/// Page attributes a page may inherit from its ancestors in the page tree
const INHERITABLE_KEYS: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Guard against malformed page trees whose Parent links form a cycle
const MAX_TREE_DEPTH: usize = 64;

/// Options for merging PDFs
#[derive(Debug, Clone)]
pub struct MergeOptions {
    /// Input PDF file paths in the order they should be merged
    pub input_paths: Vec<PathBuf>,
    /// Output PDF file path
    pub output_path: PathBuf,
}

/// Merge multiple PDF files into a single PDF and return its page count
///
/// Pages keep their order within each source, and sources keep the order of
/// `input_paths`. Each source is read completely into memory by
/// `Document::load`, so no file handle stays open once loading returns.
///
/// Based on the lopdf merge example:
/// https://github.com/J-F-Liu/lopdf/blob/main/examples/merge.rs
///
/// # Example
///
/// ```no_run
/// use pdf_combine::pdf::{MergeOptions, merge_pdfs};
/// use std::path::PathBuf;
///
/// let options = MergeOptions {
///     input_paths: vec![
///         PathBuf::from("scan.pdf"),
///         PathBuf::from("invoice.pdf"),
///     ],
///     output_path: PathBuf::from("combined.pdf"),
/// };
///
/// let pages = merge_pdfs(&options).expect("Failed to merge");
/// ```
pub fn merge_pdfs(options: &MergeOptions) -> Result<usize> {
    if options.input_paths.is_empty() {
        return Err(Error::NoInputs);
    }

    // Validate all input files exist
    for path in &options.input_paths {
        if !path.exists() {
            return Err(Error::FileNotFound(path.clone()));
        }
    }

    let mut documents: Vec<Document> = Vec::with_capacity(options.input_paths.len());
    for path in &options.input_paths {
        let doc = Document::load(path).map_err(|source| Error::Merge {
            path: path.clone(),
            source,
        })?;

        if doc.get_pages().is_empty() {
            return Err(Error::EmptyPdf(path.clone()));
        }

        documents.push(doc);
    }

    let mut max_id = 1;
    let mut page_ids: Vec<ObjectId> = Vec::new();
    let mut objects: BTreeMap<ObjectId, Object> = BTreeMap::new();

    for mut doc in documents {
        // Renumber objects in this document to avoid conflicts
        doc.renumber_objects_with(max_id);
        max_id = doc.max_id + 1;

        for (_, page_id) in doc.get_pages() {
            inherit_page_attributes(&mut doc, page_id)?;
            page_ids.push(page_id);
        }

        // The old catalog and page tree nodes are replaced below
        objects.extend(
            doc.objects
                .into_iter()
                .filter(|(_, object)| !is_document_structure(object)),
        );
    }

    let mut merged_doc = Document::with_version("1.5");
    merged_doc.objects.extend(objects);

    // new_object_id() must hand out IDs above everything copied in
    merged_doc.max_id = max_id - 1;

    let pages_id = merged_doc.new_object_id();
    let catalog_id = merged_doc.new_object_id();

    let kids: Vec<Object> = page_ids.iter().map(|&id| Object::Reference(id)).collect();

    let mut pages_object = Dictionary::new();
    pages_object.set("Type", Object::Name(b"Pages".to_vec()));
    pages_object.set("Count", Object::Integer(page_ids.len() as i64));
    pages_object.set("Kids", Object::Array(kids));

    let mut catalog = Dictionary::new();
    catalog.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog.set("Pages", Object::Reference(pages_id));

    merged_doc.objects.insert(catalog_id, Object::Dictionary(catalog));
    merged_doc.objects.insert(pages_id, Object::Dictionary(pages_object));
    merged_doc.trailer.set("Root", Object::Reference(catalog_id));

    for &page_id in &page_ids {
        if let Ok(Object::Dictionary(dict)) = merged_doc.get_object_mut(page_id) {
            dict.set("Parent", Object::Reference(pages_id));
        }
    }

    // Outlines and other objects only reachable from the dropped catalogs
    let pruned = merged_doc.prune_objects();
    debug!(
        "Merged {} files into {} pages ({} unreachable objects dropped)",
        options.input_paths.len(),
        page_ids.len(),
        pruned.len()
    );

    merged_doc.compress();
    merged_doc.save(&options.output_path)?;

    Ok(page_ids.len())
}

/// Whether an object is a document catalog or an intermediate page tree node
fn is_document_structure(object: &Object) -> bool {
    match object {
        Object::Dictionary(dict) => match dict.get(b"Type").and_then(Object::as_name) {
            Ok(name) => name == b"Catalog" || name == b"Pages",
            Err(_) => false,
        },
        _ => false,
    }
}

/// Copy attributes the page inherits from its page tree ancestors onto the
/// page itself, so it stays complete once re-parented
fn inherit_page_attributes(doc: &mut Document, page_id: ObjectId) -> Result<()> {
    let mut inherited: Vec<(&[u8], Object)> = Vec::new();

    {
        let page = doc.get_dictionary(page_id)?;
        let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
        let mut depth = 0;

        while let Some(parent_id) = parent {
            if depth == MAX_TREE_DEPTH {
                break;
            }
            depth += 1;

            let node = match doc.get_dictionary(parent_id) {
                Ok(node) => node,
                Err(_) => break,
            };

            for key in INHERITABLE_KEYS {
                let already_set =
                    page.has(key) || inherited.iter().any(|(existing, _)| *existing == key);
                if already_set {
                    continue;
                }
                if let Ok(value) = node.get(key) {
                    inherited.push((key, value.clone()));
                }
            }

            parent = node.get(b"Parent").and_then(Object::as_reference).ok();
        }
    }

    if inherited.is_empty() {
        return Ok(());
    }

    let page = doc.get_dictionary_mut(page_id)?;
    for (key, value) in inherited {
        page.set(key, value);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::count_pages;
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Stream};
    use std::path::Path;
    use tempfile::TempDir;

    /// Write a PDF whose pages hang off an intermediate Pages node that
    /// carries the MediaBox, so every page depends on inheritance.
    fn write_nested_pdf(path: &Path, pages: usize, width: i64) {
        let mut doc = Document::with_version("1.5");
        let root_pages_id = doc.new_object_id();
        let inner_pages_id = doc.new_object_id();

        let mut kids = Vec::new();
        for i in 0..pages {
            let content = Content {
                operations: vec![Operation::new("BT", vec![]), Operation::new("ET", vec![])],
            };
            let content_id =
                doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => inner_pages_id,
                "Contents" => content_id,
                "Rotate" => (i as i64) * 90,
            });
            kids.push(Object::Reference(page_id));
        }

        doc.objects.insert(
            inner_pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Parent" => root_pages_id,
                "Kids" => kids,
                "Count" => pages as i64,
                "MediaBox" => vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(width),
                    Object::Integer(792),
                ],
            }),
        );
        doc.objects.insert(
            root_pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![Object::Reference(inner_pages_id)],
                "Count" => pages as i64,
                "Resources" => dictionary! {},
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => root_pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.save(path).unwrap();
    }

    fn media_box_width(doc: &Document, page_id: ObjectId) -> i64 {
        let page = doc.get_dictionary(page_id).unwrap();
        let media_box = page.get(b"MediaBox").unwrap().as_array().unwrap();
        media_box[2].as_i64().unwrap()
    }

    #[test]
    fn test_merge_options_creation() {
        let options = MergeOptions {
            input_paths: vec![PathBuf::from("test1.pdf"), PathBuf::from("test2.pdf")],
            output_path: PathBuf::from("merged.pdf"),
        };

        assert_eq!(options.input_paths.len(), 2);
        assert_eq!(options.output_path, Path::new("merged.pdf"));
    }

    #[test]
    fn test_merge_keeps_source_order_and_inherited_attributes() {
        let dir = TempDir::new().unwrap();
        let first = dir.path().join("first.pdf");
        let second = dir.path().join("second.pdf");
        write_nested_pdf(&first, 2, 600);
        write_nested_pdf(&second, 3, 400);
        let output = dir.path().join("merged.pdf");

        let pages = merge_pdfs(&MergeOptions {
            input_paths: vec![first, second],
            output_path: output.clone(),
        })
        .unwrap();

        assert_eq!(pages, 5);
        assert_eq!(count_pages(&output).unwrap(), 5);

        let merged = Document::load(&output).unwrap();
        let widths: Vec<i64> = merged
            .get_pages()
            .values()
            .map(|&id| media_box_width(&merged, id))
            .collect();
        assert_eq!(widths, vec![600, 600, 400, 400, 400]);

        // Rotation is the page's own attribute and must survive untouched
        let rotations: Vec<i64> = merged
            .get_pages()
            .values()
            .map(|&id| {
                merged
                    .get_dictionary(id)
                    .unwrap()
                    .get(b"Rotate")
                    .unwrap()
                    .as_i64()
                    .unwrap()
            })
            .collect();
        assert_eq!(rotations, vec![0, 90, 0, 90, 180]);
    }

    #[test]
    fn test_merge_single_catalog() {
        let dir = TempDir::new().unwrap();
        let first = dir.path().join("a.pdf");
        let second = dir.path().join("b.pdf");
        write_nested_pdf(&first, 1, 500);
        write_nested_pdf(&second, 1, 500);
        let output = dir.path().join("merged.pdf");

        merge_pdfs(&MergeOptions {
            input_paths: vec![first, second],
            output_path: output.clone(),
        })
        .unwrap();

        let merged = Document::load(&output).unwrap();
        let catalogs = merged
            .objects
            .values()
            .filter(|object| {
                matches!(object, Object::Dictionary(dict)
                    if dict.get(b"Type").and_then(Object::as_name).ok() == Some(b"Catalog".as_slice()))
            })
            .count();
        assert_eq!(catalogs, 1);
    }

    #[test]
    fn test_merge_rejects_invalid_pdf() {
        let dir = TempDir::new().unwrap();
        let valid = dir.path().join("valid.pdf");
        write_nested_pdf(&valid, 1, 500);
        let broken = dir.path().join("broken.pdf");
        std::fs::write(&broken, b"%PDF-1.4\nthis is not a pdf body").unwrap();
        let output = dir.path().join("merged.pdf");

        let result = merge_pdfs(&MergeOptions {
            input_paths: vec![valid, broken.clone()],
            output_path: output.clone(),
        });

        assert!(matches!(result, Err(Error::Merge { ref path, .. }) if *path == broken));
        assert!(!output.exists());
    }

    #[test]
    fn test_merge_empty_input_list() {
        let result = merge_pdfs(&MergeOptions {
            input_paths: vec![],
            output_path: PathBuf::from("unused.pdf"),
        });
        assert!(matches!(result, Err(Error::NoInputs)));
    }
}
