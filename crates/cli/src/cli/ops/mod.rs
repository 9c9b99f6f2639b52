pub mod combine;
pub mod confirm;
pub mod init;
pub mod shard;
pub mod split;
pub mod status;
pub mod version;
pub mod watch;

pub use combine::Combine;
pub use confirm::Confirm;
pub use init::Init;
pub use shard::Shard;
pub use split::Split;
pub use status::Status;
pub use version::Version;
pub use watch::Watch;

#[cfg(test)]
mod test {
    use common::crypto::Mnemonic;

    use super::*;
    use crate::cli::op::{Op, OpContext};

    const SECRET: &str = "legal winner thank year wave sausage worth useful legal winner thank yellow";

    async fn init(dir: &std::path::Path) -> OpContext {
        let ctx = OpContext::new(Some(dir.to_path_buf()), Some("pw".to_string()));
        Init {
            account: "alice".to_string(),
            kdf_iterations: 1_000,
            language: "english".to_string(),
            log_dir: None,
            custody_url: None,
        }
        .execute(&ctx)
        .await
        .unwrap();
        ctx
    }

    #[tokio::test]
    async fn test_split_save_and_combine() {
        let temp_dir = tempfile::tempdir().unwrap();
        let ctx = init(temp_dir.path()).await;

        let split = Split {
            secret: SECRET.to_string(),
            shares: 3,
            threshold: 2,
            save: true,
        }
        .execute(&ctx)
        .await
        .unwrap();
        assert_eq!(split.shares.len(), 3);

        let list = shard::list::List { json: false }.execute(&ctx).await.unwrap();
        assert_eq!(list.listing.held.len(), 3);
        assert!(list.listing.owned.is_empty());

        let (shard_id, share) = &split.shares[2];
        let fetched = shard::get::Get {
            shard_id: shard_id.to_string(),
        }
        .execute(&ctx)
        .await
        .unwrap();
        assert_eq!(&fetched, share);

        let combined = Combine {
            shares: split.shares[..2].iter().map(|(_, s)| s.to_string()).collect(),
        }
        .execute(&ctx)
        .await
        .unwrap();
        assert_eq!(combined, Mnemonic::from(SECRET));
    }

    #[tokio::test]
    async fn test_upload_confirm_and_status() {
        let temp_dir = tempfile::tempdir().unwrap();
        let ctx = init(temp_dir.path()).await;

        let split = Split {
            secret: SECRET.to_string(),
            shares: 2,
            threshold: 2,
            save: false,
        }
        .execute(&ctx)
        .await
        .unwrap();
        let (shard_id, share) = &split.shares[0];
        shard::upload::Upload {
            share: share.to_string(),
        }
        .execute(&ctx)
        .await
        .unwrap();

        let status = Status {
            sync: false,
            json: false,
        }
        .execute(&ctx)
        .await
        .unwrap();
        assert_eq!(status.statuses.len(), 1);
        assert!(!status.statuses[0].is_confirmed());

        Confirm {
            shard_ids: vec![shard_id.to_string()],
            party: "carol".to_string(),
        }
        .execute(&ctx)
        .await
        .unwrap();

        let watched = Watch {
            shard_id: shard_id.to_string(),
            history: true,
        }
        .execute(&ctx)
        .await
        .unwrap();
        assert!(watched.to_string().contains("carol"));

        let status = Status {
            sync: true,
            json: false,
        }
        .execute(&ctx)
        .await
        .unwrap();
        assert!(status.statuses[0].is_confirmed());
    }

    #[tokio::test]
    async fn test_missing_password() {
        let temp_dir = tempfile::tempdir().unwrap();
        init(temp_dir.path()).await;
        let ctx = OpContext::new(Some(temp_dir.path().to_path_buf()), None);

        let result = Split {
            secret: SECRET.to_string(),
            shares: 2,
            threshold: 2,
            save: false,
        }
        .execute(&ctx)
        .await;
        assert!(matches!(
            result,
            Err(split::SplitError::Split(
                common::crypto::KeySplitError::MissingPassword
            ))
        ));
    }
}
