use crate::RegistryError;
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use image::{DynamicImage, ImageFormat};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Oldest age accepted at registration.
pub const MAX_AGE: u32 = 18;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS child_registry (
    id TEXT PRIMARY KEY,
    child_name TEXT NOT NULL,
    age INTEGER NOT NULL,
    clothing_color TEXT NOT NULL,
    lost_location TEXT NOT NULL,
    image_path TEXT NOT NULL,
    created_at TEXT NOT NULL
)";

/// Registration form contents. Attributes are opaque to the matcher.
#[derive(Debug, Clone)]
pub struct NewSubject {
    pub name: String,
    pub age: u32,
    pub clothing: String,
    pub last_location: String,
}

impl NewSubject {
    fn validate(&self) -> Result<(), RegistryError> {
        for (field, value) in [
            ("name", &self.name),
            ("clothing", &self.clothing),
            ("last_location", &self.last_location),
        ] {
            if value.trim().is_empty() {
                return Err(RegistryError::MissingField(field));
            }
        }
        if self.age > MAX_AGE {
            return Err(RegistryError::InvalidAge {
                got: self.age,
                max: MAX_AGE,
            });
        }
        Ok(())
    }
}

/// A stored enrollment record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Subject {
    pub id: String,
    pub name: String,
    pub age: u32,
    pub clothing: String,
    pub last_location: String,
    pub image_path: PathBuf,
    pub created_at: DateTime<Utc>,
}

impl Subject {
    /// Decode the stored reference photo.
    pub fn load_photo(&self) -> Result<DynamicImage, RegistryError> {
        Ok(image::open(&self.image_path)?)
    }
}

/// Accessor for the single active (most recently enrolled) subject.
pub trait SubjectSource {
    fn latest(&self) -> Result<Option<Subject>, RegistryError>;
}

pub struct SubjectStore {
    conn: Connection,
    upload_dir: PathBuf,
}

impl SubjectStore {
    /// Open (creating if needed) the database and the photo directory.
    pub fn open(db_path: &Path, upload_dir: &Path) -> Result<Self, RegistryError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(db_path)?;
        tracing::debug!(path = %db_path.display(), "registry database opened");
        Self::with_connection(conn, upload_dir)
    }

    pub fn open_in_memory(upload_dir: &Path) -> Result<Self, RegistryError> {
        Self::with_connection(Connection::open_in_memory()?, upload_dir)
    }

    fn with_connection(conn: Connection, upload_dir: &Path) -> Result<Self, RegistryError> {
        std::fs::create_dir_all(upload_dir)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn,
            upload_dir: upload_dir.to_path_buf(),
        })
    }

    /// Validate, persist the photo, and insert a new subject.
    pub fn register(
        &self,
        subject: NewSubject,
        photo: &DynamicImage,
    ) -> Result<Subject, RegistryError> {
        subject.validate()?;

        let id = uuid::Uuid::new_v4().to_string();
        let image_path = self.upload_dir.join(format!("{id}.png"));
        // Lossless, so a re-derived patch equals one taken from the upload.
        DynamicImage::ImageRgb8(photo.to_rgb8()).save_with_format(&image_path, ImageFormat::Png)?;

        // Stored at microsecond precision; keep the returned value identical.
        let created_at = Utc::now().trunc_subsecs(6);
        let inserted = self.conn.execute(
            "INSERT INTO child_registry
                (id, child_name, age, clothing_color, lost_location, image_path, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                id,
                subject.name,
                subject.age,
                subject.clothing,
                subject.last_location,
                image_path.to_string_lossy().into_owned(),
                created_at.to_rfc3339_opts(SecondsFormat::Micros, true),
            ],
        );
        if let Err(err) = inserted {
            // Don't leave an orphaned photo behind.
            let _ = std::fs::remove_file(&image_path);
            return Err(err.into());
        }

        tracing::info!(id = %id, name = %subject.name, "subject registered");
        Ok(Subject {
            id,
            name: subject.name,
            age: subject.age,
            clothing: subject.clothing,
            last_location: subject.last_location,
            image_path,
            created_at,
        })
    }

    pub fn count(&self) -> Result<usize, RegistryError> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM child_registry", [], |row| row.get(0))?;
        Ok(n as usize)
    }
}

impl SubjectSource for SubjectStore {
    fn latest(&self) -> Result<Option<Subject>, RegistryError> {
        let row = self
            .conn
            .query_row(
                "SELECT id, child_name, age, clothing_color, lost_location, image_path, created_at
                 FROM child_registry
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT 1",
                [],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, u32>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                        row.get::<_, String>(6)?,
                    ))
                },
            )
            .optional()?;

        let Some((id, name, age, clothing, last_location, image_path, created_at)) = row else {
            return Ok(None);
        };
        let created_at = DateTime::parse_from_rfc3339(&created_at)
            .map_err(|e| RegistryError::InvalidTimestamp(format!("{created_at}: {e}")))?
            .with_timezone(&Utc);

        Ok(Some(Subject {
            id,
            name,
            age,
            clothing,
            last_location,
            image_path: PathBuf::from(image_path),
            created_at,
        }))
    }
}
