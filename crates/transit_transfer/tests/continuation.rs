//! Transfer loop tests against stub connectors.

use parking_lot::Mutex;
use std::sync::Arc;
use transit_transfer::{
    AuthData, ConnectorError, ContinuationData, ExportInformation, ExportResult, Exporter,
    IdempotentImportExecutor, ImportOutcome, Importer, PaginationData, Transfer,
};
use uuid::Uuid;

#[derive(Debug, Clone)]
enum Item {
    Album { id: &'static str },
    Photo { id: &'static str, album: &'static str },
}

/// First call: `Continue` with cursor "page2". Second call: `End`.
#[derive(Default)]
struct TwoPageExporter {
    seen: Mutex<Vec<Option<ExportInformation>>>,
}

impl Exporter<Vec<Item>> for TwoPageExporter {
    fn export(
        &self,
        _job_id: Uuid,
        _auth: &AuthData,
        info: Option<&ExportInformation>,
    ) -> Result<ExportResult<Vec<Item>>, ConnectorError> {
        let mut seen = self.seen.lock();
        seen.push(info.cloned());
        Ok(if seen.len() == 1 {
            ExportResult::continue_with(
                Some(vec![
                    Item::Album { id: "summer" },
                    Item::Photo {
                        id: "p1",
                        album: "summer",
                    },
                ]),
                ContinuationData::next_page(PaginationData::token("page2")),
            )
        } else {
            ExportResult::end(vec![
                Item::Photo {
                    id: "p2",
                    album: "summer",
                },
                Item::Photo {
                    id: "corrupt",
                    album: "summer",
                },
            ])
        })
    }
}

/// Creates albums, then attaches photos to the cached destination album id.
#[derive(Default)]
struct AlbumImporter {
    created_albums: Mutex<Vec<String>>,
    attached: Mutex<Vec<(String, String)>>,
}

impl Importer<Vec<Item>> for AlbumImporter {
    fn import_item(
        &self,
        _job_id: Uuid,
        executor: &IdempotentImportExecutor,
        _auth: &AuthData,
        data: Vec<Item>,
    ) -> Result<ImportOutcome, ConnectorError> {
        for item in data {
            match item {
                Item::Album { id } => {
                    executor.execute_and_swallow(id, id, || {
                        let dest = format!("dest-{id}");
                        self.created_albums.lock().push(dest.clone());
                        Ok(dest)
                    })?;
                }
                Item::Photo { id, album } => {
                    let dest_album: String = executor.get_cached_value(album);
                    executor.execute_and_swallow(id, id, || {
                        if id == "corrupt" {
                            return Err(ConnectorError::io("upload rejected"));
                        }
                        self.attached
                            .lock()
                            .push((id.to_string(), dest_album.clone()));
                        Ok(())
                    })?;
                }
            }
        }
        Ok(ImportOutcome::Ok)
    }
}

#[test]
fn exporter_called_twice_with_page2_cursor() {
    let exporter = Arc::new(TwoPageExporter::default());
    let importer = Arc::new(AlbumImporter::default());
    let transfer = Transfer::<Vec<Item>>::new(exporter.clone(), importer.clone());

    let auth = AuthData::from("token");
    let summary = transfer.run(Uuid::new_v4(), &auth, &auth).unwrap();

    let seen = exporter.seen.lock();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0], None);
    assert_eq!(
        seen[1].as_ref().and_then(|i| i.pagination.as_ref()),
        Some(&PaginationData::token("page2"))
    );

    assert_eq!(summary.pages, 2);
    assert_eq!(summary.items_imported, 3);
    assert_eq!(summary.item_errors.len(), 1);
    assert_eq!(summary.item_errors[0].key, "corrupt");
}

#[test]
fn dependent_items_use_cached_destination_ids() {
    let importer = Arc::new(AlbumImporter::default());
    let transfer =
        Transfer::<Vec<Item>>::new(Arc::new(TwoPageExporter::default()), importer.clone());

    let auth = AuthData::from("token");
    transfer.run(Uuid::new_v4(), &auth, &auth).unwrap();

    assert_eq!(*importer.created_albums.lock(), vec!["dest-summer"]);
    assert_eq!(
        *importer.attached.lock(),
        vec![
            ("p1".to_string(), "dest-summer".to_string()),
            ("p2".to_string(), "dest-summer".to_string()),
        ]
    );
}
