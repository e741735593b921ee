//! SQLite-backed [`Store`] implementation.
//!
//! Embeddings are stored as little-endian `f32` BLOBs in the row they
//! belong to. Chunk indexes are stored as text (`"3"`, `"image_0"`) and
//! ordered in Rust, since SQL text ordering would put `"10"` before `"2"`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use docqa_core::embedding::{blob_to_vec, vec_to_blob};
use docqa_core::models::{Chunk, ChunkIndex, Document, DocumentImage};
use docqa_core::store::Store;

/// SQLite implementation of the [`Store`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

const DOCUMENT_COLUMNS: &str = "id, filename, original_filename, file_type, file_size, \
     file_path, uploaded_by, upload_date, text_content";

const CHUNK_COLUMNS: &str = "id, document_id, chunk_index, chunk_text, hash, embedding, page_number";

fn document_from_row(row: &SqliteRow) -> Result<Document> {
    let file_size: i64 = row.try_get("file_size")?;
    Ok(Document {
        id: row.try_get("id")?,
        filename: row.try_get("filename")?,
        original_filename: row.try_get("original_filename")?,
        file_type: row.try_get("file_type")?,
        file_size: file_size.max(0) as u64,
        file_path: row.try_get("file_path")?,
        uploaded_by: row.try_get("uploaded_by")?,
        upload_date: row.try_get::<DateTime<Utc>, _>("upload_date")?,
        text_content: row.try_get("text_content")?,
    })
}

fn chunk_from_row(row: &SqliteRow) -> Result<Chunk> {
    let index: String = row.try_get("chunk_index")?;
    let chunk_index: ChunkIndex = index
        .parse()
        .with_context(|| format!("corrupt chunk row {:?}", row.try_get::<String, _>("id").ok()))?;
    let embedding: Option<Vec<u8>> = row.try_get("embedding")?;
    let page_number: Option<i64> = row.try_get("page_number")?;
    Ok(Chunk {
        id: row.try_get("id")?,
        document_id: row.try_get("document_id")?,
        chunk_index,
        text: row.try_get("chunk_text")?,
        hash: row.try_get("hash")?,
        embedding: embedding.as_deref().map(blob_to_vec),
        page_number: page_number.and_then(|p| u32::try_from(p).ok()),
    })
}

fn image_from_row(row: &SqliteRow) -> Result<DocumentImage> {
    let image_index: i64 = row.try_get("image_index")?;
    let embedding: Option<Vec<u8>> = row.try_get("embedding")?;
    Ok(DocumentImage {
        id: row.try_get("id")?,
        document_id: row.try_get("document_id")?,
        payload: row.try_get("payload")?,
        image_index: image_index.max(0) as usize,
        ai_description: row.try_get("ai_description")?,
        image_context: row.try_get("image_context")?,
        embedding: embedding.as_deref().map(blob_to_vec),
        extracted_at: row.try_get::<DateTime<Utc>, _>("extracted_at")?,
    })
}

#[async_trait]
impl Store for SqliteStore {
    async fn insert_document(&self, doc: &Document) -> Result<()> {
        sqlx::query(&format!(
            "INSERT INTO documents ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            DOCUMENT_COLUMNS
        ))
        .bind(&doc.id)
        .bind(&doc.filename)
        .bind(&doc.original_filename)
        .bind(&doc.file_type)
        .bind(doc.file_size as i64)
        .bind(&doc.file_path)
        .bind(&doc.uploaded_by)
        .bind(doc.upload_date)
        .bind(&doc.text_content)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn insert_chunk(&self, chunk: &Chunk) -> Result<()> {
        sqlx::query(&format!(
            "INSERT INTO chunks ({}) VALUES (?, ?, ?, ?, ?, ?, ?)",
            CHUNK_COLUMNS
        ))
        .bind(&chunk.id)
        .bind(&chunk.document_id)
        .bind(chunk.chunk_index.to_string())
        .bind(&chunk.text)
        .bind(&chunk.hash)
        .bind(chunk.embedding.as_deref().map(vec_to_blob))
        .bind(chunk.page_number.map(i64::from))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn insert_image(&self, image: &DocumentImage) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO document_images (id, document_id, payload, image_index,
                                         ai_description, image_context, embedding, extracted_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&image.id)
        .bind(&image.document_id)
        .bind(&image.payload)
        .bind(image.image_index as i64)
        .bind(&image.ai_description)
        .bind(&image.image_context)
        .bind(image.embedding.as_deref().map(vec_to_blob))
        .bind(image.extracted_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_document(&self, id: &str) -> Result<Option<Document>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM documents WHERE id = ?",
            DOCUMENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(document_from_row).transpose()
    }

    async fn list_documents(&self) -> Result<Vec<Document>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM documents ORDER BY upload_date DESC, id",
            DOCUMENT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(document_from_row).collect()
    }

    async fn list_chunks(&self) -> Result<Vec<Chunk>> {
        let rows = sqlx::query(&format!("SELECT {} FROM chunks", CHUNK_COLUMNS))
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(chunk_from_row).collect()
    }

    async fn document_chunks(&self, document_id: &str) -> Result<Vec<Chunk>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM chunks WHERE document_id = ?",
            CHUNK_COLUMNS
        ))
        .bind(document_id)
        .fetch_all(&self.pool)
        .await?;
        let mut chunks = rows
            .iter()
            .map(chunk_from_row)
            .collect::<Result<Vec<_>>>()?;
        chunks.sort_by_key(|c| c.chunk_index);
        Ok(chunks)
    }

    async fn document_images(&self, document_id: &str) -> Result<Vec<DocumentImage>> {
        let rows = sqlx::query(
            r#"
            SELECT id, document_id, payload, image_index, ai_description,
                   image_context, embedding, extracted_at
            FROM document_images
            WHERE document_id = ?
            ORDER BY image_index
            "#,
        )
        .bind(document_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(image_from_row).collect()
    }

    async fn delete_document(&self, id: &str) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM chunks WHERE document_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM document_images WHERE document_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM documents WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrate::run_migrations;
    use docqa_core::chunk::{chunk_text, make_chunk};

    async fn memory_store() -> SqliteStore {
        let pool = crate::db::connect_in_memory().await.unwrap();
        run_migrations(&pool).await.unwrap();
        SqliteStore::new(pool)
    }

    fn doc(id: &str) -> Document {
        Document {
            id: id.into(),
            filename: format!("{id}.txt"),
            original_filename: "guide.txt".into(),
            file_type: "TXT".into(),
            file_size: 42,
            file_path: format!("/tmp/{id}.txt"),
            uploaded_by: "user-1".into(),
            upload_date: Utc::now(),
            text_content: Some("hello".into()),
        }
    }

    #[tokio::test]
    async fn document_roundtrip() {
        let store = memory_store().await;
        let d = doc("d1");
        store.insert_document(&d).await.unwrap();
        let loaded = store.get_document("d1").await.unwrap().unwrap();
        assert_eq!(loaded.original_filename, "guide.txt");
        assert_eq!(loaded.file_size, 42);
        assert_eq!(loaded.text_content.as_deref(), Some("hello"));
        assert!(store.get_document("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn chunks_keep_embeddings_and_numeric_order() {
        let store = memory_store().await;
        store.insert_document(&doc("d1")).await.unwrap();

        let text = "x".repeat(12);
        let mut chunks = chunk_text("d1", &text, 1);
        chunks.reverse();
        for (i, c) in chunks.iter_mut().enumerate() {
            if i % 2 == 0 {
                c.embedding = Some(vec![0.5, -1.0]);
            }
            store.insert_chunk(c).await.unwrap();
        }
        let mut image_chunk = make_chunk("d1", ChunkIndex::Image(0), "[IMAGE DESCRIPTION]: a");
        image_chunk.embedding = Some(vec![1.0, 0.0]);
        store.insert_chunk(&image_chunk).await.unwrap();

        let loaded = store.document_chunks("d1").await.unwrap();
        let order: Vec<String> = loaded.iter().map(|c| c.chunk_index.to_string()).collect();
        assert_eq!(order.first().map(String::as_str), Some("0"));
        assert_eq!(order[10], "10");
        assert_eq!(order.last().map(String::as_str), Some("image_0"));
        assert_eq!(loaded.last().unwrap().embedding, Some(vec![1.0, 0.0]));
        assert_eq!(store.list_chunks().await.unwrap().len(), 13);
        assert!(loaded.iter().any(|c| c.embedding.is_none()));
    }

    #[tokio::test]
    async fn chunk_for_missing_document_is_rejected() {
        let store = memory_store().await;
        let c = make_chunk("ghost", ChunkIndex::Text(0), "orphan");
        assert!(store.insert_chunk(&c).await.is_err());
    }

    #[tokio::test]
    async fn delete_removes_chunks_and_images() {
        let store = memory_store().await;
        store.insert_document(&doc("d1")).await.unwrap();
        store.insert_document(&doc("d2")).await.unwrap();
        store
            .insert_chunk(&make_chunk("d1", ChunkIndex::Text(0), "one"))
            .await
            .unwrap();
        store
            .insert_chunk(&make_chunk("d2", ChunkIndex::Text(0), "two"))
            .await
            .unwrap();
        store
            .insert_image(&DocumentImage {
                id: "img".into(),
                document_id: "d1".into(),
                payload: "data:image/png;base64,AAAA".into(),
                image_index: 0,
                ai_description: Some("a button".into()),
                image_context: None,
                embedding: Some(vec![0.1, 0.2]),
                extracted_at: Utc::now(),
            })
            .await
            .unwrap();
        assert_eq!(store.document_images("d1").await.unwrap().len(), 1);

        assert!(store.delete_document("d1").await.unwrap());
        assert!(!store.delete_document("d1").await.unwrap());
        assert!(store.document_images("d1").await.unwrap().is_empty());
        let remaining = store.list_chunks().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].document_id, "d2");
    }
}
