#[cfg(test)]
mod tests {
    use crate::{MembankConfig, Membank, NewMemory, QueryRequest, SearchEngineKind};
    use tempfile::TempDir;

    #[test]
    fn lexical_index_is_rebuilt_after_reopen() {
        let dir = TempDir::new().unwrap();
        let config = MembankConfig::default()
            .db_path(dir.path())
            .embedding_enabled(false);

        // Phase 1: create, ingest, close
        {
            let bank = Membank::open(config.clone()).unwrap();
            for i in 0..200 {
                let content = format!(
                    "Document {i} with searchable content about technology and {}",
                    "artificial intelligence systems"
                );
                bank.add(NewMemory::new(content).project("lex")).unwrap();
            }
            bank.add(NewMemory::new("an unrelated grocery list: eggs, flour"))
                .unwrap();
            bank.close().unwrap();
        }

        // Phase 2: reopen and search
        {
            let bank = Membank::open(config).unwrap();
            assert_eq!(bank.health().unwrap().rows, 201);

            let response = bank
                .query(&QueryRequest::new("artificial intelligence").limit(500))
                .unwrap();
            assert_eq!(response.engine, SearchEngineKind::Lexical);
            assert_eq!(response.items.len(), 200, "every technology document matches");
            assert!(
                response
                    .items
                    .iter()
                    .all(|hit| hit.record.project.as_deref() == Some("lex"))
            );

            let eggs = bank.query(&QueryRequest::new("eggs")).unwrap();
            assert_eq!(eggs.items.len(), 1);
        }
    }

    #[test]
    fn lexical_index_tracks_writes_between_queries() {
        let bank = Membank::open(MembankConfig::default().embedding_enabled(false)).unwrap();
        bank.add(NewMemory::new("first note about tantivy")).unwrap();
        assert_eq!(bank.query(&QueryRequest::new("tantivy")).unwrap().items.len(), 1);

        bank.add(NewMemory::new("second note about tantivy")).unwrap();
        assert_eq!(bank.query(&QueryRequest::new("tantivy")).unwrap().items.len(), 2);

        let id = bank.query(&QueryRequest::new("first")).unwrap().items[0]
            .record
            .id
            .clone();
        bank.delete(&id).unwrap();
        assert_eq!(bank.query(&QueryRequest::new("tantivy")).unwrap().items.len(), 1);
    }
}
