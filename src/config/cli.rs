use clap::{Parser, Subcommand};

#[derive(Debug, Clone, Parser)]
#[command(name = "course-sync")]
#[command(about = "Inspect and rearrange course/module associations against the content API")]
pub struct CliConfig {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "course-sync.toml")]
    pub config: String,

    /// Override `api.base_url` from the config file
    #[arg(long)]
    pub api_base_url: Option<String>,

    /// Refetch after every confirmed change
    #[arg(long)]
    pub refetch: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Print every course with its ordered modules, then the unassigned pool
    Show,
    /// Add a module to the end of a course
    Assign {
        #[arg(long)]
        module: String,
        #[arg(long)]
        course: String,
    },
    /// Move a module inside a course (0-based positions)
    Reorder {
        #[arg(long)]
        course: String,
        #[arg(long)]
        from: usize,
        #[arg(long)]
        to: usize,
    },
    /// Delete a module and all of its memberships
    DeleteModule {
        #[arg(long)]
        module: String,
    },
    /// Delete a course; its modules are kept
    DeleteCourse {
        #[arg(long)]
        course: String,
    },
}
