use clap::{Arg, ArgAction, ArgMatches, Command};
use serde_json::json;
use std::io::Write;
use std::process;
use std::sync::Arc;

use foxia_lib::dialogs::DialogState;
use foxia_lib::events::ws::WsEventForwarder;
use foxia_lib::events::{EventBus, EventHandler, PROFILES_CHANGED};
use foxia_lib::host::http::HttpInvoker;
use foxia_lib::profile::{BrowserFilter, MergedProfile};
use foxia_lib::settings_manager::{FoxiaSettings, SessionHandle, SettingsManager};
use foxia_lib::{HomeOptions, HomeView, HostClient, LogNotifier, SyncOutcome};

fn init_logging() {
  env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
    .format_timestamp_millis()
    .init();
}

fn cli() -> Command {
  Command::new("foxia")
    .about("Foxia profile list and Odoo cloud sync")
    .subcommand_required(true)
    .subcommand(
      Command::new("list")
        .about("List merged local and cloud profiles")
        .arg(Arg::new("group").long("group").help("Group id, 'default' for ungrouped"))
        .arg(
          Arg::new("browser")
            .long("browser")
            .value_parser(|s: &str| s.parse::<BrowserFilter>())
            .help("all, cloud, camoufox or wayfern"),
        )
        .arg(Arg::new("search").long("search").help("Match against name or note"))
        .arg(
          Arg::new("json")
            .long("json")
            .action(ArgAction::SetTrue)
            .help("Print rows as JSON"),
        ),
    )
    .subcommand(
      Command::new("upload")
        .about("Upload a local profile to Odoo")
        .arg(Arg::new("id").required(true).help("Local profile id"))
        .arg(
          Arg::new("no-create")
            .long("no-create")
            .action(ArgAction::SetTrue)
            .help("Never create a new Odoo record"),
        ),
    )
    .subcommand(
      Command::new("download")
        .about("Download a profile's cloud copy")
        .arg(Arg::new("id").required(true).help("Row id")),
    )
    .subcommand(
      Command::new("import-cloud")
        .about("Import a cloud-only profile")
        .arg(Arg::new("id").required(true).help("Row id, e.g. cloud-42")),
    )
    .subcommand(
      Command::new("delete")
        .about("Delete a profile")
        .arg(Arg::new("id").required(true).help("Row id"))
        .arg(
          Arg::new("server")
            .long("server")
            .action(ArgAction::SetTrue)
            .help("Also delete the Odoo record"),
        ),
    )
    .subcommand(
      Command::new("import-json")
        .about("Import profiles from a zs-mkt JSON export")
        .arg(Arg::new("file").required(true).help("Path to the JSON file")),
    )
    .subcommand(
      Command::new("session")
        .about("Manage the stored Odoo session")
        .subcommand_required(true)
        .subcommand(
          Command::new("set")
            .arg(Arg::new("url").long("url").required(true).help("Odoo base url"))
            .arg(
              Arg::new("session-id")
                .long("session-id")
                .required(true)
                .help("Odoo session cookie"),
            )
            .arg(Arg::new("username").long("username")),
        )
        .subcommand(Command::new("clear")),
    )
    .subcommand(Command::new("watch").about("Follow host events and keep the list current"))
}

fn row_json(row: &MergedProfile) -> serde_json::Value {
  json!({
    "id": row.id(),
    "name": row.name(),
    "browser": row.browser().as_str(),
    "version": row.version(),
    "odooId": row.odoo_id(),
    "groupId": row.group_id(),
    "profileUrl": row.profile_url(),
    "createdAt": row.created_at(),
    "status": row.status(),
    "synced": row.is_synced(),
  })
}

fn print_rows(view: &HomeView, as_json: bool) {
  let page = view.rows();
  if as_json {
    let rows: Vec<_> = page.rows.iter().map(row_json).collect();
    // stdout is the machine readable channel
    println!(
      "{}",
      json!({
        "rows": rows,
        "counts": {
          "all": page.counts.all,
          "camoufox": page.counts.camoufox,
          "wayfern": page.counts.wayfern,
          "cloud": page.counts.cloud,
        }
      })
    );
    return;
  }

  let stdout = std::io::stdout();
  let mut out = stdout.lock();
  for row in &page.rows {
    let _ = writeln!(
      out,
      "{:<24} {:<32} {:<10} {:<8} {}",
      row.id(),
      row.name(),
      row.browser().as_str(),
      row.odoo_id().unwrap_or("-"),
      row.status().unwrap_or(if row.is_synced() { "synced" } else { "" }),
    );
  }
  let _ = writeln!(
    out,
    "all {} / camoufox {} / wayfern {} / cloud {}",
    page.counts.all, page.counts.camoufox, page.counts.wayfern, page.counts.cloud
  );
}

fn find_row_or_exit(view: &HomeView, id: &str) -> MergedProfile {
  match view.find_row(id) {
    Some(row) => row,
    None => {
      eprintln!("No profile with id {id}");
      process::exit(1);
    }
  }
}

fn exit_with(outcome: SyncOutcome) -> ! {
  match outcome {
    SyncOutcome::Completed => process::exit(0),
    SyncOutcome::Skipped => {
      eprintln!("Nothing to do");
      process::exit(0)
    }
    SyncOutcome::Failed(message) => {
      eprintln!("{message}");
      process::exit(1)
    }
  }
}

fn handle_session(manager: &SettingsManager, matches: &ArgMatches) {
  let result = if let Some(set) = matches.subcommand_matches("set") {
    let url = set.get_one::<String>("url").cloned().unwrap_or_default();
    let session_id = set
      .get_one::<String>("session-id")
      .cloned()
      .unwrap_or_default();
    let username = set.get_one::<String>("username").cloned();
    manager.save_session(&url, &session_id, username)
  } else {
    manager.clear_session()
  };

  match result {
    Ok(_) => log::info!("[settings] Session saved to {}", manager.get_settings_file().display()),
    Err(e) => {
      eprintln!("Failed to save session: {e}");
      process::exit(1);
    }
  }
}

async fn watch(view: Arc<HomeView>, bus: Arc<EventBus>, settings: &FoxiaSettings) {
  let forwarder = WsEventForwarder::new(bus.clone());
  if let Err(e) = forwarder.connect(&settings.host_url).await {
    eprintln!("Failed to connect to host events: {e}");
    process::exit(1);
  }

  let printer = view.clone();
  let _printed = bus.subscribe(
    PROFILES_CHANGED,
    Arc::new(move |_: &serde_json::Value| {
      let view = printer.clone();
      tokio::spawn(async move {
        // the view reloads on the same event; give it a moment
        tokio::time::sleep(std::time::Duration::from_millis(500)).await;
        print_rows(&view, false);
      });
    }) as EventHandler,
  );

  view.mount();
  view.mounted().await;
  print_rows(&view, false);

  if let Err(e) = tokio::signal::ctrl_c().await {
    log::error!("Failed to wait for ctrl-c: {e}");
  }
  view.unmount();
  forwarder.disconnect();
}

#[tokio::main(flavor = "multi_thread")]
async fn main() {
  init_logging();

  let matches = cli().get_matches();

  let manager = SettingsManager::new();
  let settings = match manager.load_settings() {
    Ok(settings) => settings,
    Err(e) => {
      eprintln!("Failed to load settings: {e}");
      process::exit(1);
    }
  };

  if let Some(session_matches) = matches.subcommand_matches("session") {
    handle_session(&manager, session_matches);
    return;
  }

  let host = HostClient::new(Arc::new(HttpInvoker::from_settings(&settings)));
  let bus = Arc::new(EventBus::new());
  let view = HomeView::new(
    host,
    bus.clone(),
    Arc::new(LogNotifier),
    SessionHandle::new(settings.odoo_session()),
    HomeOptions::from_settings(&settings),
  );
  view.refresh_all().await;

  match matches.subcommand() {
    Some(("list", list)) => {
      if let Some(group) = list.get_one::<String>("group") {
        view.select_group(group);
      }
      if let Some(filter) = list.get_one::<BrowserFilter>("browser") {
        view.set_browser_filter(*filter);
      }
      if let Some(search) = list.get_one::<String>("search") {
        view.set_search(search);
      }
      print_rows(&view, list.get_flag("json"));
    }
    Some(("upload", upload)) => {
      let id = upload.get_one::<String>("id").cloned().unwrap_or_default();
      let row = find_row_or_exit(&view, &id);
      let Some(local) = row.local() else {
        eprintln!("{id} is cloud-only, nothing to upload");
        process::exit(1);
      };
      let allow_create = !upload.get_flag("no-create");
      exit_with(view.controller().upload(local, allow_create).await);
    }
    Some(("download", download)) => {
      let id = download.get_one::<String>("id").cloned().unwrap_or_default();
      let row = find_row_or_exit(&view, &id);
      exit_with(view.download(&row).await);
    }
    Some(("import-cloud", import)) => {
      let id = import.get_one::<String>("id").cloned().unwrap_or_default();
      match find_row_or_exit(&view, &id) {
        MergedProfile::CloudOnly(cloud) => exit_with(view.import_cloud(&cloud).await),
        _ => {
          eprintln!("{id} already has a local copy");
          process::exit(1);
        }
      }
    }
    Some(("delete", delete)) => {
      let id = delete.get_one::<String>("id").cloned().unwrap_or_default();
      let row = find_row_or_exit(&view, &id);
      if !view.delete_profile(&row, delete.get_flag("server")).await {
        process::exit(1);
      }
    }
    Some(("import-json", import)) => {
      let file = import.get_one::<String>("file").cloned().unwrap_or_default();
      let input = match std::fs::read_to_string(&file) {
        Ok(input) => input,
        Err(e) => {
          eprintln!("Failed to read {file}: {e}");
          process::exit(1);
        }
      };
      view.open_dialog(DialogState::ZsmktImport);
      if view.submit_zsmkt_import(&input).await.is_none() {
        process::exit(1);
      }
    }
    Some(("watch", _)) => watch(view, bus, &settings).await,
    _ => {
      log::error!("Unknown command");
      process::exit(1);
    }
  }
}
