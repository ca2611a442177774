//! Writes a skeleton FastAPI backend to disk.
//!
//! The template is fixed: a handful of package folders and base files. No
//! part of it depends on the extracted requirements.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

/// Package folders, each gets an `__init__.py`.
pub const PACKAGES: [&str; 6] = [
    "app",
    "app/models",
    "app/schemas",
    "app/services",
    "app/routers",
    "app/core",
];

const INIT_PY: &str = "# Init\n";

const MAIN_PY: &str = r#"from fastapi import FastAPI

app = FastAPI()

@app.get("/")
def root():
    return {"message": "Project scaffolded successfully."}
"#;

const ENV_FILE: &str = "# Add your environment variables here";

const REQUIREMENTS_TXT: &str = "fastapi\nuvicorn\nsqlalchemy\npython-dotenv\npsycopg2-binary\npydantic\n";

const RUN_SH: &str = "uvicorn app.main:app --reload --port 8000";

/// Folder name for a project scaffolded now, e.g. `project_20261018_1432`.
pub fn project_name() -> String {
    chrono::Local::now().format("project_%Y%m%d_%H%M").to_string()
}

/// Scaffold into a new timestamped folder under `base_dir`.
pub async fn scaffold_project(base_dir: &Path) -> Result<PathBuf> {
    let name = project_name();
    let project_dir = base_dir.join(&name);
    scaffold_at(&project_dir, &name).await?;
    info!(path = %project_dir.display(), "Project scaffolded");
    Ok(project_dir)
}

/// Write the template into `project_dir`. Existing folders are reused and
/// existing files overwritten.
pub async fn scaffold_at(project_dir: &Path, name: &str) -> Result<()> {
    for package in PACKAGES {
        let dir = project_dir.join(package);
        create_folder(&dir).await?;
        write_file(&dir.join("__init__.py"), INIT_PY).await?;
    }

    let readme = format!("# Auto-generated FastAPI Project - {name}\n");
    let files: [(&str, &str); 5] = [
        ("app/main.py", MAIN_PY),
        (".env", ENV_FILE),
        ("requirements.txt", REQUIREMENTS_TXT),
        ("README.md", &readme),
        ("run.sh", RUN_SH),
    ];

    for (relative, content) in files {
        write_file(&project_dir.join(relative), content).await?;
    }

    Ok(())
}

async fn create_folder(path: &Path) -> Result<()> {
    if fs::try_exists(path).await.unwrap_or(false) {
        info!(path = %path.display(), "Already exists");
        return Ok(());
    }

    fs::create_dir_all(path)
        .await
        .with_context(|| format!("Failed to create {}", path.display()))?;
    info!(path = %path.display(), "Created");
    Ok(())
}

async fn write_file(path: &Path, content: &str) -> Result<()> {
    fs::write(path, content)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!(path = %path.display(), "Created");
    Ok(())
}
