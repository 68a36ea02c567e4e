//! Command implementations. Output goes to any writer so tests can capture it.

use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::io::Write;

use vellum_core::{ItemKey, VersionTag, VersionedStore};

use crate::cli::{Command, EntityArgs, GetArgs, ListArgs};

pub struct Inspector {
    store: VersionedStore,
    page_size: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VersionLine {
    key: String,
    revision: u32,
    updated_at: String,
}

impl Inspector {
    pub fn new(store: VersionedStore, page_size: usize) -> Self {
        Self { store, page_size }
    }

    pub async fn run(&self, cmd: Command, out: &mut impl Write) -> Result<()> {
        match cmd {
            Command::Keys(args) => self.keys(args, out).await,
            Command::Get(args) => self.get(args, out).await,
            Command::History(args) => self.history(args, out).await,
            Command::List(args) => self.list(args, out).await,
        }
    }

    async fn keys(&self, args: EntityArgs, out: &mut impl Write) -> Result<()> {
        let versions = self.store.list_versions(args.kind, &args.id).await?;
        if versions.is_empty() {
            bail!("no items under {}", ItemKey::current(args.kind, &args.id).pk);
        }
        for record in versions {
            let key = record.key();
            writeln!(out, "{}\t{}", key.pk, key.sk)?;
        }
        Ok(())
    }

    async fn get(&self, args: GetArgs, out: &mut impl Write) -> Result<()> {
        let version = match args.version {
            None | Some(0) => VersionTag::CURRENT,
            Some(n) => VersionTag::archived(n),
        };
        let record = self
            .store
            .get_version(args.entity.kind, &args.entity.id, version)
            .await?
            .with_context(|| {
                format!(
                    "{} is not stored",
                    ItemKey::for_entity(args.entity.kind, &args.entity.id, version)
                )
            })?;
        print_json(out, &record)
    }

    async fn history(&self, args: EntityArgs, out: &mut impl Write) -> Result<()> {
        let summary = self
            .store
            .history(args.kind, &args.id)
            .await?
            .with_context(|| format!("{} {} has no current record", args.kind, args.id))?;
        print_json(out, &summary)?;

        for record in self.store.list_versions(args.kind, &args.id).await? {
            let line = VersionLine {
                key: record.key().to_string(),
                revision: record.revision,
                updated_at: record.updated_at.to_rfc3339(),
            };
            writeln!(out, "{}", serde_json::to_string(&line)?)?;
        }
        Ok(())
    }

    async fn list(&self, args: ListArgs, out: &mut impl Write) -> Result<()> {
        let limit = args.limit.unwrap_or(self.page_size);
        let page = self
            .store
            .query_by_kind(args.kind, Some(limit), args.page_token.as_deref())
            .await?;
        tracing::debug!(kind = %args.kind, count = page.items.len(), "listed page");
        print_json(out, &page)
    }
}

fn print_json(out: &mut impl Write, value: &impl Serialize) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use vellum_core::{EntityKind, FieldMap, MemoryTable, NewEntity};

    async fn inspector() -> Inspector {
        let store = VersionedStore::new(Arc::new(MemoryTable::default()));
        let mut fields = FieldMap::new();
        fields.insert("email".to_string(), json!("a@x.com"));
        store
            .create(NewEntity::with_id(EntityKind::User, "u-1", fields))
            .await
            .unwrap();
        let mut patch = FieldMap::new();
        patch.insert("email".to_string(), json!("b@x.com"));
        store.update(EntityKind::User, "u-1", patch, true).await.unwrap();
        Inspector::new(store, 10)
    }

    async fn run(inspector: &Inspector, cmd: Command) -> Result<String> {
        let mut out = Vec::new();
        inspector.run(cmd, &mut out).await?;
        Ok(String::from_utf8(out).unwrap())
    }

    fn entity(kind: EntityKind, id: &str) -> EntityArgs {
        EntityArgs {
            kind,
            id: id.to_string(),
        }
    }

    #[tokio::test]
    async fn test_keys_lists_every_version() {
        let inspector = inspector().await;
        let out = run(&inspector, Command::Keys(entity(EntityKind::User, "u-1")))
            .await
            .unwrap();
        assert_eq!(out, "USER#u-1\tV0\nUSER#u-1\tV1\n");

        assert!(run(&inspector, Command::Keys(entity(EntityKind::User, "nope")))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_get_archived_version() {
        let inspector = inspector().await;
        let out = run(
            &inspector,
            Command::Get(GetArgs {
                entity: entity(EntityKind::User, "u-1"),
                version: Some(1),
            }),
        )
        .await
        .unwrap();
        let record: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(record["email"], json!("a@x.com"));
        assert_eq!(record["version"], json!("V1"));

        let missing = run(
            &inspector,
            Command::Get(GetArgs {
                entity: entity(EntityKind::User, "u-1"),
                version: Some(5),
            }),
        )
        .await;
        assert!(missing.unwrap_err().to_string().contains("V5"));
    }

    #[tokio::test]
    async fn test_history_and_list() {
        let inspector = inspector().await;
        let out = run(&inspector, Command::History(entity(EntityKind::User, "u-1")))
            .await
            .unwrap();
        assert!(out.contains("\"archivedVersions\": 1"));
        assert!(out.contains("USER#u-1/V1"));

        let out = run(
            &inspector,
            Command::List(ListArgs {
                kind: EntityKind::User,
                limit: None,
                page_token: None,
            }),
        )
        .await
        .unwrap();
        let page: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(page["items"].as_array().unwrap().len(), 1);
        assert!(page.get("nextPageToken").is_none());
    }
}
