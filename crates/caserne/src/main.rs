//! `caserne` - CLI for the station inventory registry
//!
//! This binary drives the registry: accounts and sessions, the gallery,
//! materiel and engin records with their inspection workflow, and personnel
//! profiles.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use caserne::card::{CardView, MaterielCard};
use caserne::cli::{
    AccountCommand, Cli, Command, ConfigCommand, EnginCommand, GalleryCommand, MaterielAddArgs,
    MaterielCommand, MaterielListArgs, OutputFormat, PersonnelAddArgs, PersonnelCommand,
    ProfileArgs,
};
use caserne::record::{
    Materiel, NewEngin, NewMateriel, NewPersonnel, PersonnelProfile, Record,
};
use caserne::view::{EnginDetail, ListQuery, ListView};
use caserne::{init_logging, Config, MaterielFilter, RecordStore, SqliteStore, WriteGate};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Load configuration
    let config = Config::load_from(cli.config.clone())?;

    match cli.command {
        // Config commands don't need the store
        Command::Config(config_cmd) => handle_config(&config, config_cmd),
        command => {
            let store: Arc<dyn RecordStore> = Arc::new(
                SqliteStore::open(config.database_path())
                    .with_context(|| format!("opening {}", config.database_path().display()))?,
            );
            let gate = Arc::new(WriteGate::new());

            match command {
                Command::Account(account_cmd) => {
                    handle_account(&store, &config, account_cmd).await
                }
                Command::Gallery(gallery_cmd) => {
                    handle_gallery(&store, &config, &gallery_cmd).await
                }
                Command::Materiel(materiel_cmd) => {
                    handle_materiel(&store, &gate, &config, materiel_cmd).await
                }
                Command::Engin(engin_cmd) => handle_engin(&store, &config, engin_cmd).await,
                Command::Personnel(personnel_cmd) => {
                    handle_personnel(&store, personnel_cmd).await
                }
                Command::Config(_) => unreachable!("handled above"),
            }
        }
    }
}

async fn handle_account(
    store: &Arc<dyn RecordStore>,
    config: &Config,
    cmd: AccountCommand,
) -> anyhow::Result<()> {
    match cmd {
        AccountCommand::SignUp {
            email,
            password,
            affectation,
        } => {
            if !config.is_known_affectation(&affectation) {
                println!(
                    "Note: '{affectation}' is not a configured station ({})",
                    config.registry.affectation_options.join(", ")
                );
            }
            let session = store.sign_up(&email, &password, &affectation).await?;
            println!("Account created; signed in as {}", session.user.email);
        }
        AccountCommand::Login { email, password } => {
            let session = store.sign_in(&email, &password).await?;
            println!("Signed in as {}", session.user.email);
        }
        AccountCommand::Logout => {
            store.sign_out().await?;
            println!("Signed out.");
        }
        AccountCommand::Whoami => match store.user().await? {
            Some(user) => {
                println!("{}", user.email);
                if let Some(affectation) = &user.affectation {
                    println!("Affectation: {affectation}");
                }
            }
            None => println!("Not signed in."),
        },
    }
    Ok(())
}

async fn handle_gallery(
    store: &Arc<dyn RecordStore>,
    config: &Config,
    cmd: &GalleryCommand,
) -> anyhow::Result<()> {
    let mut list = ListView::new(Arc::clone(store), ListQuery::Gallery);
    list.load().await?;

    if list.is_empty() {
        print_empty_hint(store).await?;
        return Ok(());
    }

    match cmd.format {
        OutputFormat::Json => print_records_json(list.records())?,
        OutputFormat::Plain | OutputFormat::Table => {
            println!("{:<10} {:<30} DESCRIPTION", "ID", "NAME");
            for record in page(list.records(), config) {
                if let Record::Gallery(item) = record {
                    println!(
                        "{:<10} {:<30} {}",
                        short_id(&item.id),
                        item.name,
                        item.description
                    );
                }
            }
            print_page_note(list.len(), config);
        }
    }
    Ok(())
}

async fn handle_materiel(
    store: &Arc<dyn RecordStore>,
    gate: &Arc<WriteGate>,
    config: &Config,
    cmd: MaterielCommand,
) -> anyhow::Result<()> {
    match cmd {
        MaterielCommand::List(args) => handle_materiel_list(store, config, &args).await,
        MaterielCommand::Add(args) => handle_materiel_add(store, args).await,
        MaterielCommand::Note {
            id,
            comment,
            quantity,
        } => {
            let record = store.materiel(&id).await?;
            let mut card = MaterielCard::new(record, Arc::clone(store), Arc::clone(gate));
            card.begin_edit()?;
            if let Some(comment) = comment {
                card.set_comment_input(comment)?;
            }
            if let Some(quantity) = &quantity {
                card.set_quantity_input(quantity)?;
            }
            let patch = card.save().await?;
            println!("Saved {}.", short_id(&patch.id));
            print_materiel_plain(card.record(), config);
            Ok(())
        }
        MaterielCommand::Control { id } => {
            let record = store.materiel(&id).await?;
            let mut card = MaterielCard::new(record, Arc::clone(store), Arc::clone(gate));
            let patch = card.toggle_controlled().await?;
            let state = if card.record().is_controlled {
                "controlled"
            } else {
                "not controlled"
            };
            println!("{} is now {state}.", short_id(&patch.id));
            Ok(())
        }
        MaterielCommand::Show { id, format } => {
            let record = store.materiel(&id).await?;
            match format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&record)?);
                }
                OutputFormat::Plain | OutputFormat::Table => {
                    print_materiel_plain(&record, config);
                }
            }
            Ok(())
        }
    }
}

async fn handle_materiel_list(
    store: &Arc<dyn RecordStore>,
    config: &Config,
    args: &MaterielListArgs,
) -> anyhow::Result<()> {
    let filter = MaterielFilter {
        name_contains: args.name.clone(),
        engin_id: args.engin.clone(),
        emplacement_contains: args.emplacement.clone(),
    };
    let mut list = ListView::new(Arc::clone(store), ListQuery::Materiels(filter));
    list.load().await?;

    if list.is_empty() {
        print_empty_hint(store).await?;
        return Ok(());
    }

    match args.format {
        OutputFormat::Json => print_records_json(list.records())?,
        OutputFormat::Plain | OutputFormat::Table => {
            let materiels: Vec<&Materiel> =
                page(list.records(), config).filter_map(Record::as_materiel).collect();
            print_materiel_table(&materiels, config);
            print_page_note(list.len(), config);
        }
    }
    Ok(())
}

async fn handle_materiel_add(
    store: &Arc<dyn RecordStore>,
    args: MaterielAddArgs,
) -> anyhow::Result<()> {
    let new = NewMateriel {
        name: args.name,
        description: args.description,
        photo_url: args.photo_url,
        doc: None,
        media: None,
        quantite: args.quantite,
        emplacement: args.emplacement,
        etat: args.etat,
        engin_id: args.engin,
        affectation: args.affectation,
    };
    let materiel = store.insert_materiel(&new).await?;
    println!("Added materiel {} ({})", materiel.name, short_id(&materiel.id));
    Ok(())
}

async fn handle_engin(
    store: &Arc<dyn RecordStore>,
    config: &Config,
    cmd: EnginCommand,
) -> anyhow::Result<()> {
    match cmd {
        EnginCommand::List { format } => {
            let mut list = ListView::new(Arc::clone(store), ListQuery::Engins);
            list.load().await?;

            if list.is_empty() {
                print_empty_hint(store).await?;
                return Ok(());
            }

            match format {
                OutputFormat::Json => print_records_json(list.records())?,
                OutputFormat::Plain | OutputFormat::Table => {
                    println!("{:<10} {:<24} AFFECTATION", "ID", "NAME");
                    for record in page(list.records(), config) {
                        if let Record::Engin(engin) = record {
                            println!(
                                "{:<10} {:<24} {}",
                                short_id(&engin.id),
                                engin.name,
                                engin.cs_affectation
                            );
                        }
                    }
                    print_page_note(list.len(), config);
                }
            }
            Ok(())
        }
        EnginCommand::Add {
            name,
            description,
            photo_url,
            affectation,
        } => {
            let engin = store
                .insert_engin(&NewEngin {
                    name,
                    description,
                    photo_url,
                    cs_affectation: affectation,
                })
                .await?;
            println!("Added engin {} ({})", engin.name, short_id(&engin.id));
            Ok(())
        }
        EnginCommand::Show {
            id,
            emplacement,
            format,
        } => handle_engin_show(store, config, &id, emplacement, format).await,
    }
}

async fn handle_engin_show(
    store: &Arc<dyn RecordStore>,
    config: &Config,
    id: &str,
    emplacement: Option<String>,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let engin = store
        .engins()
        .await?
        .into_iter()
        .find(|e| e.id == id || short_id(&e.id) == id)
        .with_context(|| format!("no engin with id {id}"))?;

    let mut detail = EnginDetail::new(Arc::clone(store), engin);
    detail.load().await?;
    detail.set_emplacement_filter(emplacement);

    if format == OutputFormat::Json {
        let payload = serde_json::json!({
            "engin": detail.engin(),
            "materiels": detail.filtered(),
            "emplacements": detail.emplacements(),
            "progress_percent": detail.progress_percent(),
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    println!("{} ({})", detail.engin().name, detail.engin().cs_affectation);
    println!("Inspection progress: {:.0}%", detail.progress_percent());
    let emplacements = detail.emplacements();
    if !emplacements.is_empty() {
        println!("Emplacements: {}", emplacements.join(", "));
    }
    if let Some(filter) = detail.emplacement_filter() {
        println!("Showing emplacement: {filter}");
    }
    println!();

    let filtered = detail.filtered();
    if filtered.is_empty() {
        println!("No materiel.");
    } else {
        print_materiel_table(&filtered, config);
    }
    Ok(())
}

async fn handle_personnel(
    store: &Arc<dyn RecordStore>,
    cmd: PersonnelCommand,
) -> anyhow::Result<()> {
    match cmd {
        PersonnelCommand::List { format } => {
            let mut list = ListView::new(Arc::clone(store), ListQuery::Personnel);
            list.load().await?;

            if list.is_empty() {
                print_empty_hint(store).await?;
                return Ok(());
            }

            match format {
                OutputFormat::Json => print_records_json(list.records())?,
                OutputFormat::Plain | OutputFormat::Table => {
                    println!("{:<24} {:<16} {:<20} STATUS", "NAME", "GRADE", "AFFECTATION");
                    for record in list.records() {
                        if let Record::Personnel(p) = record {
                            println!(
                                "{:<24} {:<16} {:<20} {}",
                                format!("{} {}", p.name, p.prenom),
                                p.grade,
                                p.affectation,
                                p.status
                            );
                        }
                    }
                }
            }
            Ok(())
        }
        PersonnelCommand::Add(args) => handle_personnel_add(store, args).await,
        PersonnelCommand::Profile(args) => handle_profile(store, args).await,
    }
}

async fn handle_personnel_add(
    store: &Arc<dyn RecordStore>,
    args: PersonnelAddArgs,
) -> anyhow::Result<()> {
    let personnel = store
        .insert_personnel(&NewPersonnel {
            name: args.name,
            prenom: args.prenom,
            grade: args.grade,
            affectation: args.affectation,
            status: args.status,
            contact_email: args.contact_email,
            photo_url: args.photo_url,
        })
        .await?;
    println!(
        "Added personnel {} {} ({})",
        personnel.name,
        personnel.prenom,
        short_id(&personnel.id)
    );
    Ok(())
}

async fn handle_profile(store: &Arc<dyn RecordStore>, args: ProfileArgs) -> anyhow::Result<()> {
    let user = store
        .user()
        .await?
        .context("not signed in; run 'caserne account login' first")?;

    let current = store
        .personnel_for_user(&user.id)
        .await?
        .context("no personnel record for this account; run 'caserne personnel add' first")?;

    if !args.is_update() {
        println!("{} {}", current.name, current.prenom);
        println!("Grade:       {}", current.grade);
        println!("Affectation: {}", current.affectation);
        println!("Status:      {}", current.status);
        println!("Contact:     {}", current.contact_email);
        return Ok(());
    }

    // Given fields replace; omitted fields keep their stored value.
    let profile = PersonnelProfile {
        name: args.name.unwrap_or(current.name),
        prenom: args.prenom.unwrap_or(current.prenom),
        grade: args.grade.unwrap_or(current.grade),
        affectation: args.affectation.unwrap_or(current.affectation),
        status: args.status.unwrap_or(current.status),
        contact_email: args.contact_email.unwrap_or(current.contact_email),
        photo_url: args.photo_url.unwrap_or(current.photo_url),
    };
    let updated = store.update_personnel_profile(&user.id, &profile).await?;
    println!("Profile updated for {} {}.", updated.name, updated.prenom);
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
                println!();
                println!("[Display]");
                println!("  Page size:          {}", config.display.page_size);
                println!(
                    "  Fallback photo:     {}",
                    config.display.fallback_photo_url
                );
                println!();
                println!("[Registry]");
                println!(
                    "  Stations:           {}",
                    config.registry.affectation_options.join(", ")
                );
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}

/// First page of a loaded collection.
fn page<'a>(records: &'a [Record], config: &Config) -> impl Iterator<Item = &'a Record> {
    records.iter().take(config.display.page_size)
}

fn print_page_note(total: usize, config: &Config) {
    if total > config.display.page_size {
        println!(
            "({} of {total} shown; raise display.page_size to see more)",
            config.display.page_size
        );
    }
}

async fn print_empty_hint(store: &Arc<dyn RecordStore>) -> anyhow::Result<()> {
    if store.session().await?.is_none() {
        println!("Not signed in; nothing to show. Run 'caserne account login' first.");
    } else {
        println!("No records.");
    }
    Ok(())
}

fn print_records_json(records: &[Record]) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(records)?);
    Ok(())
}

fn print_materiel_table(materiels: &[&Materiel], config: &Config) {
    println!(
        "{:<10} {:<24} {:>7}  {:<18} {:<16} {:<4} FLAG",
        "ID", "NAME", "QTY", "EMPLACEMENT", "ENGIN", "CTRL"
    );
    for materiel in materiels {
        let view = CardView::from_materiel(materiel, &config.display.fallback_photo_url);
        println!(
            "{:<10} {:<24} {:>7}  {:<18} {:<16} {:<4} {}",
            short_id(&materiel.id),
            view.name,
            view.quantity_label,
            view.emplacement,
            view.engin_name.as_deref().unwrap_or("-"),
            if view.controlled { "yes" } else { "no" },
            if view.highlighted { "!" } else { "" }
        );
    }
}

fn print_materiel_plain(materiel: &Materiel, config: &Config) {
    let view = CardView::from_materiel(materiel, &config.display.fallback_photo_url);
    println!("{} ({})", view.name, short_id(&materiel.id));
    println!("  Quantity:    {}", view.quantity_label);
    println!("  Emplacement: {}", view.emplacement);
    println!("  Etat:        {}", materiel.etat);
    if let Some(engin) = &view.engin_name {
        println!("  Engin:       {engin}");
    }
    if let Some(comment) = &materiel.comment {
        if !comment.trim().is_empty() {
            println!("  Comment:     {comment}");
        }
    }
    println!(
        "  Controlled:  {}",
        if view.controlled { "yes" } else { "no" }
    );
    if view.highlighted {
        println!("  Needs attention");
    }
}

/// Leading eight characters of a store-assigned identity, for display.
fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}
