//! Storage layer using RocksDB
//!
//! # Column Families
//!
//! - `accounts` - Per-user balance rows (key: user_id)
//! - `entries` - Append-only ledger entries (key: entry_id)
//! - `idempotency` - Replay tokens (key: idempotency_key, value: entry_id)
//! - `indices` - Secondary indices for fast lookups
//!
//! Every mutation commits entry + balance + replay token in a single
//! `WriteBatch`, so no concurrent reader can observe a partial write.
//! The duplicate-key lookup in [`Storage::apply_mutation`] is the
//! store-level backstop for idempotency-key uniqueness; the wallet
//! actor's single-writer loop makes the check-then-insert race-free.

use crate::{
    error::{Error, Result},
    types::{Account, LedgerEntry, UserId},
    Config,
};
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DBCompactionStyle, Options, WriteBatch, DB};
use std::sync::Arc;
use uuid::Uuid;

/// Column family names
const CF_ACCOUNTS: &str = "accounts";
const CF_ENTRIES: &str = "entries";
const CF_IDEMPOTENCY: &str = "idempotency";
const CF_INDICES: &str = "indices";

/// Storage wrapper for RocksDB
pub struct Storage {
    db: Arc<DB>,
    // Column family handles are stored in DB, accessed by name
}

impl Storage {
    /// Open or create database
    pub fn open(config: &Config) -> Result<Self> {
        let path = &config.data_dir;

        // Create directory if not exists
        std::fs::create_dir_all(path)?;

        // Database options
        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        // Tuning from config
        db_opts.set_write_buffer_size(config.rocksdb.write_buffer_size_mb * 1024 * 1024);
        db_opts.set_max_write_buffer_number(config.rocksdb.max_write_buffer_number);
        db_opts.set_target_file_size_base(config.rocksdb.target_file_size_mb * 1024 * 1024);
        db_opts.set_max_background_jobs(config.rocksdb.max_background_jobs);

        // Universal compaction for write-heavy workload
        db_opts.set_compaction_style(DBCompactionStyle::Universal);

        // Column family descriptors
        let cf_descriptors = vec![
            ColumnFamilyDescriptor::new(CF_ACCOUNTS, Self::cf_options_accounts()),
            ColumnFamilyDescriptor::new(CF_ENTRIES, Self::cf_options_entries()),
            ColumnFamilyDescriptor::new(CF_IDEMPOTENCY, Self::cf_options_idempotency()),
            ColumnFamilyDescriptor::new(CF_INDICES, Self::cf_options_indices()),
        ];

        // Open database
        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;

        tracing::info!("Opened RocksDB at {:?}", path);

        Ok(Self { db: Arc::new(db) })
    }

    // Column family options

    fn cf_options_accounts() -> Options {
        let mut opts = Options::default();
        // Balances are hot reads, use LZ4 for speed
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts
    }

    fn cf_options_entries() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Zstd);
        opts.set_bottommost_compression_type(rocksdb::DBCompressionType::Zstd);
        opts
    }

    fn cf_options_idempotency() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        // Point lookups dominate, bloom filters pay off
        let mut block_opts = rocksdb::BlockBasedOptions::default();
        block_opts.set_bloom_filter(10.0, false); // 10 bits per key
        opts.set_block_based_table_factory(&block_opts);
        opts
    }

    fn cf_options_indices() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts
    }

    // Helper: get column family handle

    fn cf_handle(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| Error::Storage(format!("Column family {} not found", name)))
    }

    // Account operations

    /// Create account row if absent
    ///
    /// Accounts are owned by the identity collaborator; re-provisioning
    /// an existing account leaves its balance unchanged.
    pub fn create_account(&self, account: &Account) -> Result<bool> {
        let cf = self.cf_handle(CF_ACCOUNTS)?;
        let key = account.user_id.as_str().as_bytes();

        if self.db.get_cf(cf, key)?.is_some() {
            return Ok(false);
        }

        let value = bincode::serialize(account)?;
        self.db.put_cf(cf, key, &value)?;

        tracing::debug!(user_id = %account.user_id, "Account created");

        Ok(true)
    }

    /// Get account by user ID
    pub fn get_account(&self, user_id: &UserId) -> Result<Account> {
        let cf = self.cf_handle(CF_ACCOUNTS)?;
        let key = user_id.as_str().as_bytes();

        let value = self
            .db
            .get_cf(cf, key)?
            .ok_or_else(|| Error::AccountNotFound(user_id.to_string()))?;

        let account: Account = bincode::deserialize(&value)?;
        Ok(account)
    }

    // Entry operations

    /// Get entry by ID
    pub fn get_entry(&self, entry_id: Uuid) -> Result<LedgerEntry> {
        let cf = self.cf_handle(CF_ENTRIES)?;
        let key = entry_id.as_bytes();

        let value = self
            .db
            .get_cf(cf, key)?
            .ok_or_else(|| Error::EntryNotFound(entry_id.to_string()))?;

        let entry: LedgerEntry = bincode::deserialize(&value)?;
        Ok(entry)
    }

    /// Look up the entry recorded under an idempotency key
    pub fn find_by_idempotency_key(&self, key: &str) -> Result<Option<LedgerEntry>> {
        let cf = self.cf_handle(CF_IDEMPOTENCY)?;

        let value = match self.db.get_cf(cf, key.as_bytes())? {
            Some(v) => v,
            None => return Ok(None),
        };

        let entry_id_bytes: [u8; 16] = value
            .as_slice()
            .try_into()
            .map_err(|_| Error::Storage("Malformed idempotency index value".to_string()))?;

        let entry = self.get_entry(Uuid::from_bytes(entry_id_bytes))?;
        Ok(Some(entry))
    }

    /// Get entries for a user, oldest first (entry IDs are UUIDv7)
    pub fn entries_for_user(&self, user_id: &UserId) -> Result<Vec<LedgerEntry>> {
        let cf_indices = self.cf_handle(CF_INDICES)?;

        let prefix = Self::index_key_user_entry(user_id, None);
        let iter = self.db.prefix_iterator_cf(cf_indices, &prefix);

        let mut entries = Vec::new();
        for item in iter {
            let (key, _) = item?;

            if !key.starts_with(&prefix) {
                break;
            }

            // Extract entry_id from key (last 16 bytes)
            if key.len() >= prefix.len() + 16 {
                let entry_id_bytes: [u8; 16] = key[key.len() - 16..]
                    .try_into()
                    .map_err(|_| Error::Storage("Malformed index key".to_string()))?;
                let entry = self.get_entry(Uuid::from_bytes(entry_id_bytes))?;
                entries.push(entry);
            }
        }

        Ok(entries)
    }

    // Mutation commit (atomic)

    /// Commit one mutation: entry + updated account + indices
    ///
    /// Exactly one persisted state change or none. Fails with
    /// `DuplicateIdempotencyKey` if the replay token is already taken.
    pub fn apply_mutation(&self, entry: &LedgerEntry, account: &Account) -> Result<()> {
        // Uniqueness backstop for the replay token
        if let Some(ref key) = entry.idempotency_key {
            let cf = self.cf_handle(CF_IDEMPOTENCY)?;
            if self.db.get_cf(cf, key.as_bytes())?.is_some() {
                return Err(Error::DuplicateIdempotencyKey(key.clone()));
            }
        }

        let mut batch = WriteBatch::default();

        // 1. Entry
        let cf_entries = self.cf_handle(CF_ENTRIES)?;
        let entry_value = bincode::serialize(entry)?;
        batch.put_cf(cf_entries, entry.entry_id.as_bytes(), &entry_value);

        // 2. Account balance
        let cf_accounts = self.cf_handle(CF_ACCOUNTS)?;
        let account_value = bincode::serialize(account)?;
        batch.put_cf(cf_accounts, account.user_id.as_str().as_bytes(), &account_value);

        // 3. Replay token
        if let Some(ref key) = entry.idempotency_key {
            let cf_idem = self.cf_handle(CF_IDEMPOTENCY)?;
            batch.put_cf(cf_idem, key.as_bytes(), entry.entry_id.as_bytes());
        }

        // 4. Index: user || entry_id -> empty
        let cf_indices = self.cf_handle(CF_INDICES)?;
        let idx_user = Self::index_key_user_entry(&entry.user_id, Some(entry.entry_id));
        batch.put_cf(cf_indices, &idx_user, &[]);

        // Atomic commit
        self.db.write(batch)?;

        tracing::debug!(
            entry_id = %entry.entry_id,
            user_id = %entry.user_id,
            kind = %entry.kind,
            amount = %entry.amount,
            "Mutation committed"
        );

        Ok(())
    }

    // Index key helpers

    // Key layout: u32 BE id length || id bytes || entry_id. The length
    // prefix keeps one user's range from absorbing another's when an id
    // is a prefix of a longer id.
    fn index_key_user_entry(user_id: &UserId, entry_id: Option<Uuid>) -> Vec<u8> {
        let id = user_id.as_str().as_bytes();
        let mut key = Vec::with_capacity(4 + id.len() + 16);
        key.extend_from_slice(&(id.len() as u32).to_be_bytes());
        key.extend_from_slice(id);
        if let Some(eid) = entry_id {
            key.extend_from_slice(eid.as_bytes());
        }
        key
    }

    // Statistics

    /// Get storage statistics
    pub fn get_stats(&self) -> Result<StorageStats> {
        let cf_accounts = self.cf_handle(CF_ACCOUNTS)?;
        let cf_entries = self.cf_handle(CF_ENTRIES)?;

        Ok(StorageStats {
            total_accounts: self.approximate_count(cf_accounts)?,
            total_entries: self.approximate_count(cf_entries)?,
        })
    }

    fn approximate_count(&self, cf: &ColumnFamily) -> Result<u64> {
        // RocksDB property for approximate count
        let prop = self
            .db
            .property_int_value_cf(cf, "rocksdb.estimate-num-keys")?
            .unwrap_or(0);

        Ok(prop)
    }

    /// Close database (graceful shutdown)
    pub fn close(self) -> Result<()> {
        drop(self.db);
        tracing::info!("RocksDB closed gracefully");
        Ok(())
    }
}

/// Storage statistics
#[derive(Debug, Clone)]
pub struct StorageStats {
    /// Approximate account count
    pub total_accounts: u64,
    /// Approximate entry count
    pub total_entries: u64,
}
