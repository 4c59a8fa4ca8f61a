use alloy_primitives::{Address, U256};
use csv::{ReaderBuilder, WriterBuilder};
use std::collections::{BTreeMap, BTreeSet};
use std::io::{Read, Write};
use std::path::Path;

use crate::error::{DistributorError, Result};
use crate::types::ClaimEntry;

pub struct CsvProcessor;

impl CsvProcessor {
    /// Read `address,amount` rows in file order.
    ///
    /// The first row is always treated as a header and skipped; columns are
    /// taken by position so the header names do not matter.
    pub fn read_claims<P: AsRef<Path>>(path: P) -> Result<Vec<ClaimEntry>> {
        let file = std::fs::File::open(path.as_ref()).map_err(|e| {
            DistributorError::InvalidInput(format!(
                "Failed to open CSV {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::read_claims_from(file)
    }

    pub fn read_claims_from<R: Read>(reader: R) -> Result<Vec<ClaimEntry>> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut entries = Vec::new();

        for (i, result) in reader.records().enumerate() {
            let record = result?;
            // Header is line 1
            let line = i + 2;

            let address_field = record.get(0).unwrap_or_default();
            let amount_field = record.get(1).ok_or_else(|| {
                DistributorError::InvalidInput(format!("line {}: missing amount column", line))
            })?;

            let address: Address = address_field.parse().map_err(|e| {
                DistributorError::InvalidInput(format!(
                    "line {}: invalid address '{}': {}",
                    line, address_field, e
                ))
            })?;
            let amount = U256::from_str_radix(amount_field, 10).map_err(|e| {
                DistributorError::InvalidInput(format!(
                    "line {}: invalid amount '{}': {}",
                    line, amount_field, e
                ))
            })?;

            entries.push(ClaimEntry::new(address, amount));
        }

        Ok(entries)
    }

    /// Sum of all amounts
    pub fn total_amount(entries: &[ClaimEntry]) -> U256 {
        entries
            .iter()
            .fold(U256::ZERO, |acc, e| acc.saturating_add(e.amount))
    }

    /// Write an allocation as `address,mav_amount`, sorted by address
    pub fn write_allocations<P: AsRef<Path>>(
        path: P,
        allocations: &BTreeMap<Address, u128>,
    ) -> Result<()> {
        let file = std::fs::File::create(path.as_ref())?;
        Self::write_allocations_to(file, allocations)
    }

    pub fn write_allocations_to<W: Write>(
        writer: W,
        allocations: &BTreeMap<Address, u128>,
    ) -> Result<()> {
        let mut writer = WriterBuilder::new().from_writer(writer);
        writer.write_record(["address", "mav_amount"])?;

        for (address, amount) in allocations {
            writer.write_record([format!("{:#x}", address), amount.to_string()])?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Write one lowercase wallet address per row under a `wallet_address` header
    pub fn write_wallets<P: AsRef<Path>>(path: P, wallets: &BTreeSet<Address>) -> Result<()> {
        let file = std::fs::File::create(path.as_ref())?;
        Self::write_wallets_to(file, wallets)
    }

    pub fn write_wallets_to<W: Write>(writer: W, wallets: &BTreeSet<Address>) -> Result<()> {
        let mut writer = WriterBuilder::new().from_writer(writer);
        writer.write_record(["wallet_address"])?;

        for wallet in wallets {
            writer.write_record([format!("{:#x}", wallet)])?;
        }

        writer.flush()?;
        Ok(())
    }
}
