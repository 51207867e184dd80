use std::path::{Path, PathBuf};

use alloy::{json_abi::JsonAbi, primitives::Bytes};
use async_trait::async_trait;
use serde_json::Value;
use tokio::process::Command;
use tracing::debug;

use super::CompileError;

/// ABI and creation bytecode of one contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledContract {
    pub abi: JsonAbi,
    pub bytecode: Bytes,
}

/// Turns a Solidity source into deployable bytecode.
#[async_trait]
pub trait Compiler: Send + Sync {
    async fn compile(&self, source: &Path, contract_name: &str)
    -> Result<CompiledContract, CompileError>;
}

/// Shells out to a local `solc` binary.
#[derive(Debug, Clone)]
pub struct SolcCompiler {
    solc: PathBuf,
    contracts_dir: PathBuf,
}

impl SolcCompiler {
    pub fn new(solc: impl Into<PathBuf>, contracts_dir: impl Into<PathBuf>) -> Self {
        Self {
            solc: solc.into(),
            contracts_dir: contracts_dir.into(),
        }
    }

    fn resolve(&self, source: &Path) -> PathBuf {
        if source.is_absolute() {
            source.to_path_buf()
        } else {
            self.contracts_dir.join(source)
        }
    }
}

#[async_trait]
impl Compiler for SolcCompiler {
    async fn compile(
        &self,
        source: &Path,
        contract_name: &str,
    ) -> Result<CompiledContract, CompileError> {
        let path = self.resolve(source);
        debug!(path = %path.display(), contract = contract_name, "compiling with solc");

        let output = Command::new(&self.solc)
            .arg("--combined-json")
            .arg("abi,bin")
            .arg(&path)
            .output()
            .await
            .map_err(CompileError::Spawn)?;

        if !output.status.success() {
            return Err(CompileError::SolcFailed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_combined_json(&stdout, contract_name, &path)
    }
}

// pick `<file>:<name>` out of `solc --combined-json abi,bin` output
pub(crate) fn parse_combined_json(
    output: &str,
    contract_name: &str,
    path: &Path,
) -> Result<CompiledContract, CompileError> {
    let parsed: Value = serde_json::from_str(output)?;
    let suffix = format!(":{contract_name}");

    let entry = parsed
        .get("contracts")
        .and_then(Value::as_object)
        .and_then(|contracts| {
            contracts
                .iter()
                .find(|(id, _)| id.ends_with(&suffix))
                .map(|(_, entry)| entry)
        })
        .ok_or_else(|| CompileError::ContractNotFound {
            name: contract_name.to_string(),
            path: path.to_path_buf(),
        })?;

    let abi = parse_abi(entry.get("abi"))?;
    let bin = entry
        .get("bin")
        .and_then(Value::as_str)
        .ok_or_else(|| CompileError::InvalidOutput("missing `bin`".to_string()))?;

    Ok(CompiledContract {
        abi,
        bytecode: parse_bytecode(bin)?,
    })
}

// older solc versions emit the abi as a JSON string
fn parse_abi(value: Option<&Value>) -> Result<JsonAbi, CompileError> {
    match value {
        Some(Value::String(raw)) => Ok(serde_json::from_str(raw)?),
        Some(value) => Ok(serde_json::from_value(value.clone())?),
        None => Err(CompileError::InvalidOutput("missing `abi`".to_string())),
    }
}

fn parse_bytecode(hex_str: &str) -> Result<Bytes, CompileError> {
    let trimmed = hex_str.trim();
    let stripped = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    Ok(Bytes::from(hex::decode(stripped)?))
}

/// Reads precompiled `<dir>/<ContractName>.json` artifacts.
///
/// Accepts both the flat `{ "abi", "bytecode": "0x.." }` shape and the
/// foundry/hardhat `{ "bytecode": { "object": "0x.." } }` shape. The source
/// path is ignored.
#[derive(Debug, Clone)]
pub struct ArtifactCompiler {
    dir: PathBuf,
}

impl ArtifactCompiler {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl Compiler for ArtifactCompiler {
    async fn compile(
        &self,
        _source: &Path,
        contract_name: &str,
    ) -> Result<CompiledContract, CompileError> {
        let path = self.dir.join(format!("{contract_name}.json"));

        let raw = tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| CompileError::Io {
                path: path.clone(),
                source,
            })?;

        let artifact: Value = serde_json::from_str(&raw)?;
        let abi = parse_abi(artifact.get("abi"))?;

        let bytecode = match artifact.get("bytecode") {
            Some(Value::String(hex_str)) => hex_str.as_str(),
            Some(Value::Object(obj)) => obj.get("object").and_then(Value::as_str).ok_or_else(
                || CompileError::InvalidOutput(format!("{}: missing bytecode.object", path.display())),
            )?,
            _ => {
                return Err(CompileError::InvalidOutput(format!(
                    "{}: missing bytecode",
                    path.display()
                )));
            }
        };

        Ok(CompiledContract {
            abi,
            bytecode: parse_bytecode(bytecode)?,
        })
    }
}
