//! Full-text ranking over record content.
//!
//! With the `lex` feature the index is a Tantivy in-RAM BM25 index keyed by record hash.
//! Without it, a token-overlap scorer stands in so lexical search still works.

use super::hybrid::Ranking;
use crate::error::Result;

/// Lower-cased alphanumeric runs of `text`.
#[must_use]
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect()
}

#[cfg(feature = "lex")]
pub use tantivy_index::LexIndex;

#[cfg(not(feature = "lex"))]
pub use overlap_index::LexIndex;

#[cfg(feature = "lex")]
mod tantivy_index {
    use tantivy::collector::TopDocs;
    use tantivy::query::QueryParser;
    use tantivy::schema::{Field, STORED, STRING, Schema, TEXT, Value};
    use tantivy::{Index, IndexReader, IndexWriter, TantivyDocument, doc};

    use super::{Ranking, Result, tokenize};

    const WRITER_MEMORY_BUDGET: usize = 20_000_000;

    pub struct LexIndex {
        index: Index,
        reader: IndexReader,
        hash_field: Field,
        content_field: Field,
        docs: usize,
    }

    impl LexIndex {
        /// Build an index from `(hash, content)` pairs.
        pub fn build<'a, I>(documents: I) -> Result<Self>
        where
            I: IntoIterator<Item = (&'a str, &'a str)>,
        {
            let mut schema_builder = Schema::builder();
            let hash_field = schema_builder.add_text_field("hash", STRING | STORED);
            let content_field = schema_builder.add_text_field("content", TEXT);
            let index = Index::create_in_ram(schema_builder.build());

            let mut writer: IndexWriter = index.writer_with_num_threads(1, WRITER_MEMORY_BUDGET)?;
            let mut docs = 0usize;
            for (hash, content) in documents {
                writer.add_document(doc!(
                    hash_field => hash.to_string(),
                    content_field => content.to_string(),
                ))?;
                docs += 1;
            }
            writer.commit()?;
            let reader = index.reader()?;

            tracing::debug!(docs, "built full-text index");
            Ok(Self {
                index,
                reader,
                hash_field,
                content_field,
                docs,
            })
        }

        /// BM25 ranking of every document matching any query term.
        pub fn search(&self, query: &str) -> Result<Ranking> {
            if self.docs == 0 || tokenize(query).is_empty() {
                return Ok(Vec::new());
            }

            let parser = QueryParser::for_index(&self.index, vec![self.content_field]);
            let (parsed, errors) = parser.parse_query_lenient(query);
            if !errors.is_empty() {
                tracing::debug!(errors = errors.len(), "lenient query parse dropped terms");
            }

            let searcher = self.reader.searcher();
            let top_docs = searcher.search(&parsed, &TopDocs::with_limit(self.docs))?;
            let mut ranking = Vec::with_capacity(top_docs.len());
            for (score, address) in top_docs {
                let retrieved = searcher.doc::<TantivyDocument>(address)?;
                if let Some(hash) = retrieved.get_first(self.hash_field).and_then(|v| v.as_str()) {
                    ranking.push((hash.to_string(), score));
                }
            }
            Ok(ranking)
        }
    }
}

#[cfg(not(feature = "lex"))]
mod overlap_index {
    use std::collections::HashSet;

    use super::{Ranking, Result, tokenize};

    pub struct LexIndex {
        documents: Vec<(String, HashSet<String>, usize)>,
    }

    impl LexIndex {
        pub fn build<'a, I>(documents: I) -> Result<Self>
        where
            I: IntoIterator<Item = (&'a str, &'a str)>,
        {
            let documents = documents
                .into_iter()
                .map(|(hash, content)| {
                    let tokens = tokenize(content);
                    let len = tokens.len();
                    (hash.to_string(), tokens.into_iter().collect(), len)
                })
                .collect();
            Ok(Self { documents })
        }

        /// Distinct query terms present in the document, damped by document length.
        pub fn search(&self, query: &str) -> Result<Ranking> {
            let terms: HashSet<String> = tokenize(query).into_iter().collect();
            if terms.is_empty() {
                return Ok(Vec::new());
            }

            let mut ranking: Ranking = self
                .documents
                .iter()
                .filter_map(|(hash, tokens, len)| {
                    let matched = terms.iter().filter(|term| tokens.contains(*term)).count();
                    (matched > 0).then(|| (hash.clone(), matched as f32 / (*len as f32).sqrt()))
                })
                .collect();
            ranking.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
            Ok(ranking)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_splits_on_punctuation() {
        assert_eq!(tokenize("Buy MILK, it's late!"), vec!["buy", "milk", "it", "s", "late"]);
        assert!(tokenize(" -- ").is_empty());
    }

    #[test]
    fn ranks_matching_documents_only() {
        let index = LexIndex::build([
            ("h1", "buy milk at the store"),
            ("h2", "rust borrow checker notes"),
            ("h3", "milk milk milk"),
        ])
        .unwrap();

        let ranking = index.search("milk").unwrap();
        let hashes: Vec<&str> = ranking.iter().map(|(hash, _)| hash.as_str()).collect();
        assert_eq!(hashes.len(), 2);
        assert!(hashes.contains(&"h1"));
        assert!(hashes.contains(&"h3"));
        assert!(!hashes.contains(&"h2"));
    }

    #[test]
    fn empty_query_or_index_yields_nothing() {
        let index = LexIndex::build([("h1", "content")]).unwrap();
        assert!(index.search("   ").unwrap().is_empty());
        let empty = LexIndex::build(std::iter::empty::<(&str, &str)>()).unwrap();
        assert!(empty.search("content").unwrap().is_empty());
    }

    #[test]
    fn query_syntax_characters_do_not_fail() {
        let index = LexIndex::build([("h1", "o'brien wrote (this) note")]).unwrap();
        let ranking = index.search("o'brien (note").unwrap();
        assert_eq!(ranking.first().map(|(hash, _)| hash.as_str()), Some("h1"));
    }
}
