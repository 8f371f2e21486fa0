use std::path::PathBuf;

use clap::{ArgGroup, Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "tk", about = "Threadkeeper: durable threads of work with notes and links", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
    #[arg(short, long, global = true)]
    pub verbose: bool,
    /// Workspace directory (overrides THREADKEEPER_WORKSPACE and config)
    #[arg(long, global = true, value_name = "DIR")]
    pub path: Option<String>,
    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create the workspace and its threads directory
    Init(InitArgs),
    /// Start a new thread
    Add(AddArgs),
    /// List threads (open ones by default)
    List(ListArgs),
    /// Show a thread and its attachments
    Show(ShowArgs),
    /// Change a thread's title, description, project, due date or tags
    Update(UpdateArgs),
    /// Mark threads as done
    Done(IdsArgs),
    /// Move done or archived threads back to open
    Reopen(IdsArgs),
    /// Archive threads
    Archive(IdsArgs),
    /// Delete threads and everything stored with them
    Rm(RmArgs),
    /// Attach a note or a link to a thread
    Attach(AttachArgs),
    /// Hide an attachment from a thread
    Detach(DetachArgs),
    /// Open an attachment with the system opener
    Open(OpenArgs),
    /// Renumber the short aliases of open threads
    Reindex(ReindexArgs),
    /// Print a thread's directory
    Path(PathArgs),
}

#[derive(Args)]
pub struct InitArgs {}

#[derive(Args)]
pub struct AddArgs {
    #[arg(required = true, num_args = 1..)]
    pub title: Vec<String>,
    #[arg(short, long)]
    pub description: Option<String>,
    #[arg(short, long)]
    pub project: Option<String>,
    /// today, tomorrow, +3d, a weekday, 2025-03-01, 3/1...
    #[arg(long)]
    pub due: Option<String>,
    #[arg(long = "tag")]
    pub tags: Vec<String>,
}

#[derive(Args)]
pub struct ListArgs {
    #[arg(short, long)]
    pub all: bool,
    #[arg(short, long)]
    pub project: Option<String>,
    #[arg(long)]
    pub status: Option<String>,
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,
    #[arg(long)]
    pub tag: Option<String>,
}

#[derive(Args)]
pub struct ShowArgs {
    pub id: String,
    /// Include every field and the full attachment history
    #[arg(long)]
    pub full: bool,
}

#[derive(Args)]
pub struct UpdateArgs {
    #[arg(required = true, num_args = 1..)]
    pub ids: Vec<String>,
    #[arg(long)]
    pub title: Option<String>,
    #[arg(short, long)]
    pub description: Option<String>,
    #[arg(short, long)]
    pub project: Option<String>,
    #[arg(long)]
    pub due: Option<String>,
    #[arg(long = "add-tag")]
    pub add_tags: Vec<String>,
    #[arg(long = "remove-tag")]
    pub remove_tags: Vec<String>,
}

#[derive(Args)]
pub struct IdsArgs {
    #[arg(required = true, num_args = 1..)]
    pub ids: Vec<String>,
}

#[derive(Args)]
pub struct RmArgs {
    #[arg(required = true, num_args = 1..)]
    pub ids: Vec<String>,
    /// Required: removal cannot be undone
    #[arg(long)]
    pub force: bool,
}

#[derive(Args)]
pub struct AttachArgs {
    #[command(subcommand)]
    pub kind: AttachKind,
}

#[derive(Subcommand)]
pub enum AttachKind {
    /// Attach a Markdown note from a file, --message, or stdin
    Note(NoteArgs),
    /// Attach a URL
    Link(LinkArgs),
}

#[derive(Args)]
pub struct NoteArgs {
    #[arg(long)]
    pub id: String,
    #[arg(long, conflicts_with = "message")]
    pub file: Option<PathBuf>,
    #[arg(short, long)]
    pub message: Option<String>,
    #[arg(long)]
    pub name: Option<String>,
}

#[derive(Args)]
pub struct LinkArgs {
    #[arg(long)]
    pub id: String,
    #[arg(long)]
    pub url: String,
    #[arg(long)]
    pub label: Option<String>,
}

#[derive(Args)]
#[command(group(ArgGroup::new("selector").required(true).args(["att", "att_id"])))]
pub struct DetachArgs {
    #[arg(long)]
    pub id: String,
    /// Attachment number as shown by `tk show`
    #[arg(long)]
    pub att: Option<usize>,
    #[arg(long)]
    pub att_id: Option<String>,
}

#[derive(Args)]
#[command(group(ArgGroup::new("selector").required(true).args(["att", "att_id"])))]
pub struct OpenArgs {
    pub id: String,
    #[arg(long)]
    pub att: Option<usize>,
    #[arg(long)]
    pub att_id: Option<String>,
    /// Print the URL or file path instead of launching an opener
    #[arg(long)]
    pub print_path: bool,
}

#[derive(Args)]
pub struct ReindexArgs {}

#[derive(Args)]
pub struct PathArgs {
    pub id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_init() {
        let cli = Cli::try_parse_from(["tk", "init"]).unwrap();
        assert!(matches!(cli.command, Command::Init(_)));
        assert_eq!(cli.format, OutputFormat::Text);
    }

    #[test]
    fn parse_add_joins_title_words() {
        let cli = Cli::try_parse_from([
            "tk", "add", "fix", "the", "build", "-p", "infra", "--tag", "ci", "--tag", "urgent",
            "--due", "friday",
        ])
        .unwrap();
        if let Command::Add(args) = cli.command {
            assert_eq!(args.title.join(" "), "fix the build");
            assert_eq!(args.project, Some("infra".into()));
            assert_eq!(args.tags, vec!["ci", "urgent"]);
            assert_eq!(args.due, Some("friday".into()));
        } else { panic!("wrong command"); }
    }

    #[test]
    fn add_needs_a_title() {
        assert!(Cli::try_parse_from(["tk", "add"]).is_err());
    }

    #[test]
    fn parse_list_filters() {
        let cli = Cli::try_parse_from(["tk", "list", "-a", "-n", "5", "--tag", "ci"]).unwrap();
        if let Command::List(args) = cli.command {
            assert!(args.all);
            assert_eq!(args.limit, Some(5));
            assert_eq!(args.tag, Some("ci".into()));
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_show_full() {
        let cli = Cli::try_parse_from(["tk", "show", "--full", "3"]).unwrap();
        if let Command::Show(args) = cli.command {
            assert!(args.full);
            assert_eq!(args.id, "3");
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_update_tags() {
        let cli = Cli::try_parse_from([
            "tk", "update", "1", "2", "--add-tag", "a", "--remove-tag", "b",
        ])
        .unwrap();
        if let Command::Update(args) = cli.command {
            assert_eq!(args.ids, vec!["1", "2"]);
            assert_eq!(args.add_tags, vec!["a"]);
            assert_eq!(args.remove_tags, vec!["b"]);
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_done_many() {
        let cli = Cli::try_parse_from(["tk", "done", "1", "4"]).unwrap();
        if let Command::Done(args) = cli.command {
            assert_eq!(args.ids, vec!["1", "4"]);
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_rm_force() {
        let cli = Cli::try_parse_from(["tk", "rm", "--force", "2"]).unwrap();
        if let Command::Rm(args) = cli.command {
            assert!(args.force);
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_attach_note_message() {
        let cli = Cli::try_parse_from(["tk", "attach", "note", "--id", "1", "-m", "hi"]).unwrap();
        if let Command::Attach(AttachArgs { kind: AttachKind::Note(args) }) = cli.command {
            assert_eq!(args.id, "1");
            assert_eq!(args.message, Some("hi".into()));
            assert!(args.file.is_none());
        } else { panic!("wrong command"); }
    }

    #[test]
    fn note_file_and_message_conflict() {
        let res = Cli::try_parse_from([
            "tk", "attach", "note", "--id", "1", "--file", "a.md", "--message", "hi",
        ]);
        assert!(res.is_err());
    }

    #[test]
    fn parse_attach_link() {
        let cli = Cli::try_parse_from([
            "tk", "attach", "link", "--id", "1", "--url", "https://x", "--label", "docs",
        ])
        .unwrap();
        if let Command::Attach(AttachArgs { kind: AttachKind::Link(args) }) = cli.command {
            assert_eq!(args.url, "https://x");
            assert_eq!(args.label, Some("docs".into()));
        } else { panic!("wrong command"); }
    }

    #[test]
    fn detach_needs_exactly_one_selector() {
        assert!(Cli::try_parse_from(["tk", "detach", "--id", "1"]).is_err());
        assert!(Cli::try_parse_from(["tk", "detach", "--id", "1", "--att", "1", "--att-id", "x"]).is_err());
        let cli = Cli::try_parse_from(["tk", "detach", "--id", "1", "--att-id", "01ABC"]).unwrap();
        if let Command::Detach(args) = cli.command {
            assert_eq!(args.att_id, Some("01ABC".into()));
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_open_print_path() {
        let cli = Cli::try_parse_from(["tk", "open", "2", "--att", "1", "--print-path"]).unwrap();
        if let Command::Open(args) = cli.command {
            assert_eq!(args.att, Some(1));
            assert!(args.print_path);
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_global_flags() {
        let cli = Cli::try_parse_from(["tk", "--format", "json", "list", "--path", "/ws", "-v"]).unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
        assert_eq!(cli.path, Some("/ws".into()));
        assert!(cli.verbose);
    }
}
