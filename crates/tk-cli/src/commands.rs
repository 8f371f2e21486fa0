use std::collections::HashSet;
use std::fs;
use std::io::{self, IsTerminal, Read};
use std::process;

use anyhow::{bail, Context};
use chrono::{DateTime, Local, SecondsFormat, Utc};
use colored::Colorize;
use serde_json::{json, Value};
use tk_sdk::{
    abbreviate, parse_due, resolve_workspace, AttachmentKind, AttachmentSelector, AttachmentTarget, Change,
    Config, CurrentAttachment, Environment, ListFilter, NewThread, ThreadRecord, ThreadStatus,
    ThreadUpdate, ThreadView, Workspace, WorkspacePaths,
};
use tracing::debug;

use crate::cli::*;

/// Per-invocation state shared by every command.
struct Session {
    paths: WorkspacePaths,
    config: Config,
    format: OutputFormat,
}

impl Session {
    fn open(&self) -> anyhow::Result<Workspace> {
        Ok(Workspace::open(self.paths.clone())?)
    }

    fn json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    fn due(&self, input: Option<&str>) -> anyhow::Result<Option<chrono::NaiveDate>> {
        let today = Local::now().date_naive();
        input
            .map(|s| parse_due(s, self.config.date_locale, today))
            .transpose()
            .map_err(Into::into)
    }
}

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let environment = Environment::from_process();
    // Without a home directory there is no config file to read; an explicit
    // --path can still work.
    let config = match environment.config_path() {
        Ok(path) => Config::load_from(&path)?,
        Err(_) => Config::default(),
    };
    let paths = resolve_workspace(cli.path.as_deref(), &environment, &config)?;
    debug!(workspace = %paths.workspace.display(), "resolved workspace");

    let session = Session {
        paths,
        config,
        format: cli.format,
    };
    match cli.command {
        Command::Init(_) => cmd_init(&session),
        Command::Add(args) => cmd_add(&session, args),
        Command::List(args) => cmd_list(&session, args),
        Command::Show(args) => cmd_show(&session, args),
        Command::Update(args) => cmd_update(&session, args),
        Command::Done(args) => cmd_status(&session, args, ThreadStatus::Done),
        Command::Reopen(args) => cmd_status(&session, args, ThreadStatus::Open),
        Command::Archive(args) => cmd_status(&session, args, ThreadStatus::Archived),
        Command::Rm(args) => cmd_rm(&session, args),
        Command::Attach(AttachArgs { kind: AttachKind::Note(args) }) => cmd_attach_note(&session, args),
        Command::Attach(AttachArgs { kind: AttachKind::Link(args) }) => cmd_attach_link(&session, args),
        Command::Detach(args) => cmd_detach(&session, args),
        Command::Open(args) => cmd_open(&session, args),
        Command::Reindex(_) => cmd_reindex(&session),
        Command::Path(args) => cmd_path(&session, args),
    }
}

fn print_json(value: &Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn cmd_init(session: &Session) -> anyhow::Result<()> {
    let report = Workspace::init(session.paths.clone())?;
    if session.json() {
        return print_json(&json!({
            "workspace": report.paths.workspace,
            "threads": report.paths.threads,
            "existed": report.existed,
        }));
    }
    if report.existed {
        println!("Workspace already initialized: {}", report.paths.workspace.display().to_string().bold());
    } else {
        println!("{} Initialized workspace: {}", "✓".green().bold(), report.paths.workspace.display().to_string().bold());
    }
    println!("  Threads: {}", report.paths.threads.display());
    Ok(())
}

fn cmd_add(session: &Session, args: AddArgs) -> anyhow::Result<()> {
    let workspace = session.open()?;
    let record = workspace.create_thread(NewThread {
        title: args.title.join(" "),
        description: args.description.unwrap_or_default(),
        project: args.project.unwrap_or_default(),
        tags: args.tags,
        due: session.due(args.due.as_deref())?,
    })?;
    if session.json() {
        return print_json(&serde_json::to_value(&record)?);
    }
    println!(
        "{} Added thread {} ({}): {}",
        "✓".green().bold(),
        alias(&record).yellow().bold(),
        record.id.to_string().dimmed(),
        record.title
    );
    Ok(())
}

fn cmd_list(session: &Session, args: ListArgs) -> anyhow::Result<()> {
    let workspace = session.open()?;
    let status = args
        .status
        .as_deref()
        .map(str::parse::<ThreadStatus>)
        .transpose()?;
    let records = workspace.list(&ListFilter {
        all: args.all,
        status,
        project: args.project,
        tag: args.tag,
        limit: args.limit.filter(|n| *n > 0),
    })?;

    if session.json() {
        return print_json(&serde_json::to_value(&records)?);
    }
    if records.is_empty() {
        println!("No threads found.");
        return Ok(());
    }
    for record in &records {
        println!("{}", list_line(record));
    }
    Ok(())
}

fn list_line(record: &ThreadRecord) -> String {
    let sid = match record.short_id.filter(|_| record.is_active()) {
        Some(n) => format!("{n:>4}"),
        None => "    ".to_string(),
    };
    let mut line = format!(
        "{} [{}] {} ({})",
        sid.yellow(),
        status_flag(record.status),
        record.title,
        record.id.abbreviated().dimmed()
    );
    if !record.project.is_empty() {
        line.push_str(&format!(" {}", format!("@{}", record.project).cyan()));
    }
    if let Some(due) = record.due_at {
        line.push_str(&format!("  due {}", due.format("%Y-%m-%d").to_string().magenta()));
    }
    if !record.tags.is_empty() {
        line.push_str(&format!("  {}", hashtags(&record.tags).blue()));
    }
    line
}

fn cmd_show(session: &Session, args: ShowArgs) -> anyhow::Result<()> {
    let workspace = session.open()?;
    let view = workspace.view(&args.id)?;
    if view.malformed > 0 && !args.full {
        eprintln!(
            "{} {} malformed attachment line(s) skipped",
            "warning:".yellow().bold(),
            view.malformed
        );
    }

    if session.json() {
        let mut value = json!({
            "thread": view.record,
            "dir": view.dir,
            "attachments": view
                .current
                .iter()
                .enumerate()
                .map(|(i, c)| json!({
                    "index": i + 1,
                    "added_at": c.added_at.to_rfc3339_opts(SecondsFormat::Secs, true),
                    "attachment": c.attachment,
                }))
                .collect::<Vec<_>>(),
            "malformed": view.malformed,
        });
        if args.full {
            value["history"] = serde_json::to_value(&view.history)?;
        }
        return print_json(&value);
    }

    if args.full {
        show_full(&view);
    } else {
        show_summary(&view);
    }
    Ok(())
}

fn show_summary(view: &ThreadView) {
    let record = &view.record;
    let header = match record.short_id {
        Some(n) => format!("Thread {n}: {}", record.title),
        None => format!("Thread: {}", record.title),
    };
    println!("{} ({})", header.bold(), record.id.to_string().dimmed());

    let mut meta = vec![format!("Status: {}", record.status)];
    if !record.project.is_empty() {
        meta.push(format!("Project: {}", record.project));
    }
    if let Some(due) = record.due_at {
        meta.push(format!("Due: {}", due.format("%Y-%m-%d")));
    }
    if !record.tags.is_empty() {
        meta.push(format!("Tags: {}", hashtags(&record.tags)));
    }
    println!("{}", meta.join(" | "));

    let description = record.description.trim();
    if !description.is_empty() {
        section("Description");
        println!("{description}");
    }
    if !view.current.is_empty() {
        section("Attachments");
        for (i, current) in view.current.iter().enumerate() {
            let n = i + 1;
            println!(
                "{n}. {} ({})  {}",
                current.attachment.name,
                attachment_summary(current),
                format!("open: tk open {} --att {n}", record.id).dimmed()
            );
        }
    }
}

fn show_full(view: &ThreadView) {
    let record = &view.record;
    let header = match record.short_id.filter(|_| record.is_active()) {
        Some(n) => format!("Thread {n} ({})", record.id),
        None => format!("Thread ({})", record.id),
    };
    println!("{}", header.bold());
    println!("{}", "-".repeat(header.chars().count()));

    println!("Status : [{}] {}", status_flag(record.status), record.status);
    if !record.project.is_empty() {
        println!("Project: {}", record.project);
    }
    if let Some(due) = record.due_at {
        println!("Due    : {}", due.format("%Y-%m-%d"));
    }
    if !record.tags.is_empty() {
        println!("Tags   : {}", hashtags(&record.tags));
    }
    println!("Created: {}", record.created_at.to_rfc3339_opts(SecondsFormat::Secs, true));
    println!("Updated: {}", record.updated_at.to_rfc3339_opts(SecondsFormat::Secs, true));
    println!("Path   : {}", view.dir.display());

    section("Title");
    println!("{}", record.title);

    section("Description");
    match record.description.trim() {
        "" => println!("{}", "(no description)".dimmed()),
        description => println!("{description}"),
    }

    section("Attachments");
    if view.current.is_empty() {
        println!("{}", "(no attachments)".dimmed());
    } else {
        for (i, current) in view.current.iter().enumerate() {
            println!(
                "{:<2} {:<12}  {}  {}",
                i + 1,
                abbreviate(&current.attachment.att_id),
                current.attachment.name,
                format!("({})", attachment_summary(current)).dimmed()
            );
        }
    }

    section("History");
    if view.history.is_empty() {
        println!("{}", "(no attachment events)".dimmed());
    } else {
        println!(
            "{}",
            format!("#  {:<6}  {:<12}  {:<4}  {:<24}  {:<6}  {}", "OP", "ID", "KIND", "NAME", "SIZE", "WHEN").bold()
        );
        for (i, event) in view.history.iter().enumerate() {
            println!(
                "{:<2} {:<6}  {:<12}  {:<4}  {:<24}  {:<6}  {}",
                i + 1,
                event.op.to_string(),
                abbreviate(&event.att.att_id),
                event.att.kind.to_string(),
                event.att.name,
                event.att.size.map_or_else(|| "-".to_string(), |s| s.to_string()),
                stamp(&event.ts)
            );
        }
    }
    if view.malformed > 0 {
        println!(
            "{} {} malformed line(s) in the attachment log were skipped",
            "Warning:".yellow().bold(),
            view.malformed
        );
    }
}

fn section(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "-".repeat(title.len()));
}

fn attachment_summary(current: &CurrentAttachment) -> String {
    let attachment = &current.attachment;
    let detail = match attachment.kind {
        AttachmentKind::Note => format!("{} B", attachment.size.unwrap_or(0)),
        AttachmentKind::Link => attachment.url.clone().unwrap_or_else(|| "-".into()),
    };
    format!("{}, {detail}, {}", attachment.kind, stamp(&current.added_at))
}

fn cmd_update(session: &Session, args: UpdateArgs) -> anyhow::Result<()> {
    let update = ThreadUpdate {
        title: args.title,
        description: args.description,
        project: args.project,
        due: session.due(args.due.as_deref())?,
        add_tags: args.add_tags,
        remove_tags: args.remove_tags,
    };
    if update.is_empty() {
        bail!("nothing to update: pass --title, --description, --project, --due, --add-tag or --remove-tag");
    }

    let workspace = session.open()?;
    let targets = resolve_all(&workspace, &args.ids)?;
    let mut changes = Vec::with_capacity(targets.len());
    for id in &targets {
        changes.push(workspace.update(id, &update)?);
    }
    report_changes(session, &changes, |change| {
        if change.changed {
            format!("Updated thread {}", describe(change))
        } else {
            format!("No changes for thread {}", describe(change))
        }
    })
}

fn cmd_status(session: &Session, args: IdsArgs, status: ThreadStatus) -> anyhow::Result<()> {
    let workspace = session.open()?;
    let targets = resolve_all(&workspace, &args.ids)?;
    let mut changes = Vec::with_capacity(targets.len());
    for id in &targets {
        changes.push(workspace.set_status(id, status)?);
    }
    report_changes(session, &changes, |change| match (status, change.changed) {
        (ThreadStatus::Open, true) => format!(
            "Reopened thread {} as {}",
            change.record.id.abbreviated(),
            alias(&change.record).yellow().bold()
        ),
        (_, true) => format!("Marked thread {} as {status}", describe(change)),
        (_, false) => format!("Thread {} is already {status}", describe(change)),
    })
}

fn report_changes(
    session: &Session,
    changes: &[Change],
    message: impl Fn(&Change) -> String,
) -> anyhow::Result<()> {
    if session.json() {
        let records: Vec<&ThreadRecord> = changes.iter().map(|c| &c.record).collect();
        return print_json(&serde_json::to_value(records)?);
    }
    for change in changes {
        let mark = if change.changed { "✓".green().bold() } else { "·".dimmed() };
        println!("{mark} {}", message(change));
    }
    Ok(())
}

/// Resolve every token before anything is mutated, so one bad token leaves
/// all threads untouched. Returns durable IDs, which stay valid while
/// aliases move, with each thread listed once even when named twice.
fn resolve_all(workspace: &Workspace, tokens: &[String]) -> anyhow::Result<Vec<String>> {
    let mut seen = HashSet::new();
    let mut ids = Vec::with_capacity(tokens.len());
    for token in tokens {
        let id = workspace.resolve(token)?.id.to_string();
        if seen.insert(id.clone()) {
            ids.push(id);
        }
    }
    Ok(ids)
}

fn cmd_rm(session: &Session, args: RmArgs) -> anyhow::Result<()> {
    if !args.force {
        bail!("rm permanently deletes threads and their attachments; pass --force to confirm");
    }
    let workspace = session.open()?;
    let targets = resolve_all(&workspace, &args.ids)?;
    let mut removed = Vec::with_capacity(targets.len());
    for id in &targets {
        removed.push(workspace.remove(id)?);
    }
    if session.json() {
        return print_json(&serde_json::to_value(&removed)?);
    }
    for record in &removed {
        println!("{} Removed thread {} ({})", "✓".green().bold(), alias(record), record.id);
    }
    Ok(())
}

fn cmd_attach_note(session: &Session, args: NoteArgs) -> anyhow::Result<()> {
    let body = match (&args.file, &args.message) {
        (Some(path), _) => fs::read(path).with_context(|| format!("reading {}", path.display()))?,
        (None, Some(message)) => message.clone().into_bytes(),
        (None, None) => {
            let mut stdin = io::stdin();
            if stdin.is_terminal() {
                bail!("no note content: use --file, --message, or pipe text on stdin");
            }
            let mut buf = Vec::new();
            stdin.read_to_end(&mut buf).context("reading note from stdin")?;
            buf
        }
    };
    let name = args.name.as_deref().or_else(|| {
        args.file
            .as_deref()
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str())
    });

    let workspace = session.open()?;
    let attached = workspace.attach_note(&args.id, &body, name)?;
    if session.json() {
        return print_json(&json!({
            "thread": attached.thread,
            "attachment": attached.attachment,
            "blob_path": attached.blob.as_ref().map(|b| &b.path),
            "deduplicated": attached.blob.as_ref().is_some_and(|b| !b.created),
        }));
    }
    let hash = attached
        .attachment
        .blob
        .as_ref()
        .map(|b| b.to_string())
        .unwrap_or_default();
    println!(
        "{} Attached note {} to {} ({})",
        "✓".green().bold(),
        attached.attachment.name.bold(),
        attached.thread.abbreviated(),
        hash.dimmed()
    );
    Ok(())
}

fn cmd_attach_link(session: &Session, args: LinkArgs) -> anyhow::Result<()> {
    let workspace = session.open()?;
    let attached = workspace.attach_link(&args.id, &args.url, args.label.as_deref())?;
    if session.json() {
        return print_json(&json!({
            "thread": attached.thread,
            "attachment": attached.attachment,
        }));
    }
    let url = attached.attachment.url.as_deref().unwrap_or_default();
    match attached.attachment.label.as_deref() {
        Some(label) => println!(
            "{} Attached link to {}: [{}] {}",
            "✓".green().bold(),
            attached.thread.abbreviated(),
            label.bold(),
            url.blue()
        ),
        None => println!(
            "{} Attached link to {}: {}",
            "✓".green().bold(),
            attached.thread.abbreviated(),
            url.blue()
        ),
    }
    Ok(())
}

fn selector(att: Option<usize>, att_id: Option<&str>) -> anyhow::Result<AttachmentSelector> {
    match (att, att_id) {
        (Some(0), _) => bail!("attachment numbers start at 1"),
        (Some(n), _) => Ok(AttachmentSelector::Index(n)),
        (None, Some(id)) if id.trim().is_empty() => bail!("--att-id must not be empty"),
        (None, Some(id)) => Ok(AttachmentSelector::Id(id.trim().to_string())),
        (None, None) => bail!("pass --att <n> or --att-id <id>"),
    }
}

fn cmd_detach(session: &Session, args: DetachArgs) -> anyhow::Result<()> {
    let selector = selector(args.att, args.att_id.as_deref())?;
    let workspace = session.open()?;
    let removed = workspace.detach(&args.id, &selector)?;
    if session.json() {
        return print_json(&json!({ "detached": removed }));
    }
    println!(
        "{} Detached {} {} ({})",
        "✓".green().bold(),
        removed.kind,
        removed.name.bold(),
        abbreviate(&removed.att_id).dimmed()
    );
    Ok(())
}

fn cmd_open(session: &Session, args: OpenArgs) -> anyhow::Result<()> {
    let selector = selector(args.att, args.att_id.as_deref())?;
    let workspace = session.open()?;
    let target = match workspace.locate(&args.id, &selector)? {
        AttachmentTarget::Url(url) => url,
        AttachmentTarget::File(path) => path.display().to_string(),
    };

    if args.print_path {
        if session.json() {
            return print_json(&json!({ "target": target }));
        }
        println!("{target}");
        return Ok(());
    }
    launch(&target)
}

fn launch(location: &str) -> anyhow::Result<()> {
    let mut command = if cfg!(target_os = "macos") {
        process::Command::new("open")
    } else if cfg!(target_os = "windows") {
        let mut c = process::Command::new("cmd");
        c.args(["/C", "start", ""]);
        c
    } else {
        process::Command::new("xdg-open")
    };
    debug!(location, "launching opener");
    let status = command
        .arg(location)
        .status()
        .context("failed to launch the system opener")?;
    if !status.success() {
        bail!("opener exited with {status}");
    }
    Ok(())
}

fn cmd_reindex(session: &Session) -> anyhow::Result<()> {
    let workspace = session.open()?;
    let report = workspace.reindex()?;
    if session.json() {
        return print_json(&json!({ "active": report.active, "changed": report.changed }));
    }
    if report.active == 0 {
        println!("No open threads to reindex.");
    } else {
        println!(
            "{} Reindexed {} open threads as 1..{} ({} changed)",
            "✓".green().bold(),
            report.active,
            report.active,
            report.changed
        );
    }
    Ok(())
}

fn cmd_path(session: &Session, args: PathArgs) -> anyhow::Result<()> {
    let workspace = session.open()?;
    let dir = workspace.thread_dir(&args.id)?;
    if session.json() {
        return print_json(&json!({ "path": dir }));
    }
    println!("{}", dir.display());
    Ok(())
}

fn alias(record: &ThreadRecord) -> String {
    record
        .short_id
        .map_or_else(|| "-".to_string(), |n| n.to_string())
}

/// `3 (01HV8Z…K3QW)`, using the alias the thread had before the change.
fn describe(change: &Change) -> String {
    let sid = change
        .previous_short_id
        .map_or_else(|| "-".to_string(), |n| n.to_string());
    format!("{} ({})", sid.yellow().bold(), change.record.id.abbreviated())
}

fn status_flag(status: ThreadStatus) -> char {
    match status {
        ThreadStatus::Open => ' ',
        ThreadStatus::Done => 'x',
        ThreadStatus::Archived => '-',
    }
}

fn hashtags(tags: &[String]) -> String {
    tags.iter()
        .map(|t| format!("#{t}"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn stamp(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%MZ").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workspace() -> (tempfile::TempDir, Workspace) {
        let dir = tempfile::tempdir().unwrap();
        let paths = WorkspacePaths::new(dir.path());
        Workspace::init(paths.clone()).unwrap();
        (dir, Workspace::open(paths).unwrap())
    }

    fn add(workspace: &Workspace, title: &str) -> ThreadRecord {
        workspace
            .create_thread(NewThread {
                title: title.into(),
                ..Default::default()
            })
            .unwrap()
    }

    #[test]
    fn alias_and_durable_id_of_one_thread_resolve_once() {
        let (_dir, ws) = workspace();
        let first = add(&ws, "first");
        let second = add(&ws, "second");

        let tokens = vec!["1".to_string(), first.id.to_string(), "2".to_string()];
        let targets = resolve_all(&ws, &tokens).unwrap();
        assert_eq!(targets, vec![first.id.to_string(), second.id.to_string()]);

        for id in &targets {
            ws.remove(id).unwrap();
        }
        assert!(ws.list(&ListFilter { all: true, ..Default::default() }).unwrap().is_empty());
    }

    #[test]
    fn unknown_token_fails_before_any_target_is_returned() {
        let (_dir, ws) = workspace();
        add(&ws, "only");
        assert!(resolve_all(&ws, &["1".to_string(), "99".to_string()]).is_err());
        assert_eq!(ws.list(&ListFilter::default()).unwrap().len(), 1);
    }

    #[test]
    fn selector_prefers_index() {
        assert_eq!(selector(Some(2), None).unwrap(), AttachmentSelector::Index(2));
        assert_eq!(
            selector(None, Some("01ABC")).unwrap(),
            AttachmentSelector::Id("01ABC".into())
        );
        assert!(selector(Some(0), None).is_err());
        assert!(selector(None, None).is_err());
    }

    #[test]
    fn numeric_att_id_stays_an_id() {
        assert_eq!(
            selector(None, Some("123")).unwrap(),
            AttachmentSelector::Id("123".into())
        );
        assert!(selector(None, Some("  ")).is_err());
    }

    #[test]
    fn status_flags() {
        assert_eq!(status_flag(ThreadStatus::Open), ' ');
        assert_eq!(status_flag(ThreadStatus::Done), 'x');
        assert_eq!(status_flag(ThreadStatus::Archived), '-');
    }

    #[test]
    fn hashtags_are_space_separated() {
        assert_eq!(hashtags(&["a".into(), "b".into()]), "#a #b");
    }

    #[test]
    fn stamp_is_minute_precision_utc() {
        let ts = chrono::DateTime::parse_from_rfc3339("2025-01-02T03:04:05Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(stamp(&ts), "2025-01-02 03:04Z");
    }
}
