//! Built-in tool implementations
//!
//! The closed set the agent ships with: file read/write/edit, search,
//! directory listing, filesystem mutation, and shell execution. Every
//! failure path is an `error: `-prefixed string returned as result text.

use async_trait::async_trait;
use serde_json::Value;

use crate::config::Config;
use crate::shell;
use crate::tool::{require_str, ParamSpec, Tool, ToolRegistry};

/// Build the full registry from config. The set is fixed for the life of
/// the process.
pub fn builtin_registry(config: &Config) -> ToolRegistry {
    ToolRegistry::new(vec![
        Box::new(ReadFileTool {
            max_bytes: config.max_file_bytes,
        }),
        Box::new(WriteFileTool),
        Box::new(EditFileTool),
        Box::new(ListDirectoryTool),
        Box::new(SearchFilesTool {
            max_results: config.max_search_results,
        }),
        Box::new(CopyPathTool),
        Box::new(MovePathTool),
        Box::new(DeletePathTool),
        Box::new(ShellTool),
    ])
}

struct ReadFileTool {
    max_bytes: usize,
}

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &'static str {
        "read_file"
    }

    fn description(&self) -> &'static str {
        "Read the contents of a file from the filesystem"
    }

    fn params(&self) -> &'static [ParamSpec] {
        &[ParamSpec { name: "path", ty: "string" }]
    }

    async fn invoke(&self, args: &Value) -> Result<String, String> {
        let path = require_str(args, "path")?;
        match std::fs::read_to_string(path) {
            Ok(content) => {
                if content.len() > self.max_bytes {
                    let mut cap = self.max_bytes;
                    while !content.is_char_boundary(cap) {
                        cap -= 1;
                    }
                    Ok(format!(
                        "{}...\n[truncated, {} bytes total]",
                        &content[..cap],
                        content.len()
                    ))
                } else {
                    Ok(content)
                }
            }
            Err(e) => Err(format!("error: reading {}: {}", path, e)),
        }
    }
}

struct WriteFileTool;

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &'static str {
        "write_file"
    }

    fn description(&self) -> &'static str {
        "Write content to a file, replacing it if it exists"
    }

    fn params(&self) -> &'static [ParamSpec] {
        &[
            ParamSpec { name: "path", ty: "string" },
            ParamSpec { name: "content", ty: "string" },
        ]
    }

    async fn invoke(&self, args: &Value) -> Result<String, String> {
        let path = require_str(args, "path")?;
        let content = require_str(args, "content")?;
        match std::fs::write(path, content) {
            Ok(_) => Ok(format!("Written {} bytes to {}", content.len(), path)),
            Err(e) => Err(format!("error: writing {}: {}", path, e)),
        }
    }
}

struct EditFileTool;

#[async_trait]
impl Tool for EditFileTool {
    fn name(&self) -> &'static str {
        "edit_file"
    }

    fn description(&self) -> &'static str {
        "Replace an exact string in a file. Set all=true to replace every occurrence; \
         otherwise old_string must appear exactly once."
    }

    fn params(&self) -> &'static [ParamSpec] {
        &[
            ParamSpec { name: "path", ty: "string" },
            ParamSpec { name: "old_string", ty: "string" },
            ParamSpec { name: "new_string", ty: "string" },
            ParamSpec { name: "all", ty: "boolean?" },
        ]
    }

    async fn invoke(&self, args: &Value) -> Result<String, String> {
        let path = require_str(args, "path")?;
        let old = require_str(args, "old_string")?;
        let new = require_str(args, "new_string")?;
        let all = args.get("all").and_then(Value::as_bool).unwrap_or(false);

        if old.is_empty() {
            return Err("error: old_string must not be empty".to_string());
        }
        if old == new {
            return Err("error: old_string and new_string are identical".to_string());
        }

        let content =
            std::fs::read_to_string(path).map_err(|e| format!("error: reading {}: {}", path, e))?;

        let count = content.matches(old).count();
        if count == 0 {
            return Err(format!("error: old_string not found in {}", path));
        }
        if count > 1 && !all {
            return Err(format!(
                "error: old_string appears {} times, use all=true",
                count
            ));
        }

        let updated = if all {
            content.replace(old, new)
        } else {
            content.replacen(old, new, 1)
        };
        std::fs::write(path, updated).map_err(|e| format!("error: writing {}: {}", path, e))?;

        let replaced = if all { count } else { 1 };
        Ok(format!("Edited {} ({} replacement(s))", path, replaced))
    }
}

struct ListDirectoryTool;

#[async_trait]
impl Tool for ListDirectoryTool {
    fn name(&self) -> &'static str {
        "list_directory"
    }

    fn description(&self) -> &'static str {
        "List files and directories in a given path"
    }

    fn params(&self) -> &'static [ParamSpec] {
        &[ParamSpec { name: "path", ty: "string?" }]
    }

    async fn invoke(&self, args: &Value) -> Result<String, String> {
        let path = args.get("path").and_then(Value::as_str).unwrap_or(".");
        let entries =
            std::fs::read_dir(path).map_err(|e| format!("error: listing {}: {}", path, e))?;

        let mut items: Vec<_> = entries.flatten().collect();
        items.sort_by_key(|e| e.file_name());

        let mut result = String::new();
        for entry in items {
            let name = entry.file_name().to_string_lossy().to_string();
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            result.push_str(&name);
            if is_dir {
                result.push('/');
            }
            result.push('\n');
        }
        if result.is_empty() {
            Ok("(empty directory)".to_string())
        } else {
            Ok(result)
        }
    }
}

struct SearchFilesTool {
    max_results: usize,
}

#[async_trait]
impl Tool for SearchFilesTool {
    fn name(&self) -> &'static str {
        "search_files"
    }

    fn description(&self) -> &'static str {
        "Search file contents under a directory with a regular expression. \
         Returns path:line: matches, skipping hidden directories and binary files."
    }

    fn params(&self) -> &'static [ParamSpec] {
        &[
            ParamSpec { name: "pattern", ty: "string" },
            ParamSpec { name: "path", ty: "string?" },
        ]
    }

    async fn invoke(&self, args: &Value) -> Result<String, String> {
        let pattern = require_str(args, "pattern")?;
        let root = args.get("path").and_then(Value::as_str).unwrap_or(".");

        let re =
            regex::Regex::new(pattern).map_err(|e| format!("error: invalid pattern: {}", e))?;

        let mut matches = Vec::new();
        let mut capped = false;
        let walker = walkdir::WalkDir::new(root).into_iter().filter_entry(|e| {
            // Don't descend into hidden directories (.git and friends).
            e.depth() == 0
                || !e
                    .file_name()
                    .to_str()
                    .map(|n| n.starts_with('.'))
                    .unwrap_or(false)
        });

        'walk: for entry in walker.flatten() {
            if !entry.file_type().is_file() {
                continue;
            }
            // Binary and unreadable files are skipped, not errors.
            let Ok(content) = std::fs::read_to_string(entry.path()) else {
                continue;
            };
            for (lineno, line) in content.lines().enumerate() {
                if re.is_match(line) {
                    if matches.len() >= self.max_results {
                        capped = true;
                        break 'walk;
                    }
                    matches.push(format!(
                        "{}:{}: {}",
                        entry.path().display(),
                        lineno + 1,
                        line.trim_end()
                    ));
                }
            }
        }

        if matches.is_empty() {
            return Ok("No matches found".to_string());
        }
        let mut result = matches.join("\n");
        if capped {
            result.push_str(&format!("\n[capped at {} results]", self.max_results));
        }
        Ok(result)
    }
}

struct CopyPathTool;

#[async_trait]
impl Tool for CopyPathTool {
    fn name(&self) -> &'static str {
        "copy_path"
    }

    fn description(&self) -> &'static str {
        "Copy a file to a new location"
    }

    fn params(&self) -> &'static [ParamSpec] {
        &[
            ParamSpec { name: "source", ty: "string" },
            ParamSpec { name: "dest", ty: "string" },
        ]
    }

    async fn invoke(&self, args: &Value) -> Result<String, String> {
        let source = require_str(args, "source")?;
        let dest = require_str(args, "dest")?;
        if std::path::Path::new(source).is_dir() {
            return Err(format!("error: {} is a directory, copy files only", source));
        }
        match std::fs::copy(source, dest) {
            Ok(bytes) => Ok(format!("Copied {} to {} ({} bytes)", source, dest, bytes)),
            Err(e) => Err(format!("error: copying {}: {}", source, e)),
        }
    }
}

struct MovePathTool;

#[async_trait]
impl Tool for MovePathTool {
    fn name(&self) -> &'static str {
        "move_path"
    }

    fn description(&self) -> &'static str {
        "Move or rename a file or directory"
    }

    fn params(&self) -> &'static [ParamSpec] {
        &[
            ParamSpec { name: "source", ty: "string" },
            ParamSpec { name: "dest", ty: "string" },
        ]
    }

    async fn invoke(&self, args: &Value) -> Result<String, String> {
        let source = require_str(args, "source")?;
        let dest = require_str(args, "dest")?;
        match std::fs::rename(source, dest) {
            Ok(_) => Ok(format!("Moved {} to {}", source, dest)),
            Err(e) => Err(format!("error: moving {}: {}", source, e)),
        }
    }
}

struct DeletePathTool;

#[async_trait]
impl Tool for DeletePathTool {
    fn name(&self) -> &'static str {
        "delete_path"
    }

    fn description(&self) -> &'static str {
        "Delete a file, or a directory with recursive=true"
    }

    fn params(&self) -> &'static [ParamSpec] {
        &[
            ParamSpec { name: "path", ty: "string" },
            ParamSpec { name: "recursive", ty: "boolean?" },
        ]
    }

    async fn invoke(&self, args: &Value) -> Result<String, String> {
        let path = require_str(args, "path")?;
        let recursive = args.get("recursive").and_then(Value::as_bool).unwrap_or(false);

        let meta = std::fs::symlink_metadata(path)
            .map_err(|e| format!("error: deleting {}: {}", path, e))?;
        let result = if meta.is_dir() {
            if recursive {
                std::fs::remove_dir_all(path)
            } else {
                std::fs::remove_dir(path)
            }
        } else {
            std::fs::remove_file(path)
        };
        match result {
            Ok(_) => Ok(format!("Deleted {}", path)),
            Err(e) => Err(format!("error: deleting {}: {}", path, e)),
        }
    }
}

struct ShellTool;

#[async_trait]
impl Tool for ShellTool {
    fn name(&self) -> &'static str {
        "shell"
    }

    fn description(&self) -> &'static str {
        "Execute a shell command and return its output with [stdout]/[stderr] \
         prefixes and an exit status. timeout is in milliseconds, clamped to \
         1000-300000 (default 30000)."
    }

    fn params(&self) -> &'static [ParamSpec] {
        &[
            ParamSpec { name: "command", ty: "string" },
            ParamSpec { name: "timeout", ty: "integer?" },
        ]
    }

    async fn invoke(&self, args: &Value) -> Result<String, String> {
        let command = require_str(args, "command")?;
        // Non-numeric or missing timeouts fall back to the default before
        // clamping, so the effective bound always lands in range.
        let timeout = args
            .get("timeout")
            .and_then(Value::as_i64)
            .unwrap_or(shell::DEFAULT_TIMEOUT_MS as i64);
        Ok(shell::execute(command, timeout).await)
    }
}
