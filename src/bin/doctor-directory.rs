#![cfg(feature = "cli")]

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process;

use clap::{Arg, ArgMatches, Command};
use dotenv::dotenv;
use log::error;

use doctor_directory::prelude::*;

#[tokio::main]
async fn main() {
    dotenv().ok();
    pretty_env_logger::init();

    let matches = cli().get_matches();
    if let Err(e) = run(&matches).await {
        error!("{}", e);
        eprintln!("{}", e.user_message("Something went wrong. Please try again."));
        if e.is_auth_failure() {
            eprintln!("Run `doctor-directory login` to sign in again.");
        }
        process::exit(1);
    }
}

fn cli() -> Command<'static> {
    let emergency = Arg::new("emergency")
        .long("emergency")
        .short('e')
        .help("Work on the emergency doctor list");
    let id = Arg::new("id").long("id").takes_value(true).required(true).help("Record id");
    let record_fields = [
        Arg::new("name").long("name").takes_value(true).help("Doctor name"),
        Arg::new("mobile").long("mobile").takes_value(true).help("Mobile number"),
        Arg::new("workplace").long("workplace").takes_value(true).help("Workplace"),
        Arg::new("consultant").long("consultant").takes_value(true).help("Consultant/Specialty"),
    ];

    Command::new("doctor-directory")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Manage your doctors and emergency-contact doctors")
        .subcommand_required(true)
        .subcommand(
            Command::new("login")
                .about("Sign in and store the session")
                .arg(Arg::new("email").long("email").takes_value(true).required(true))
                .arg(Arg::new("password").long("password").takes_value(true).required(true)),
        )
        .subcommand(
            Command::new("register")
                .about("Create an account")
                .arg(Arg::new("username").long("username").takes_value(true).required(true))
                .arg(Arg::new("email").long("email").takes_value(true).required(true))
                .arg(Arg::new("password").long("password").takes_value(true).required(true)),
        )
        .subcommand(Command::new("logout").about("Forget the stored session"))
        .subcommand(Command::new("whoami").about("Show the stored session"))
        .subcommand(
            Command::new("list")
                .about("List doctors")
                .arg(emergency.clone())
                .arg(Arg::new("search").long("search").short('s').takes_value(true).help("Filter by name")),
        )
        .subcommand(
            Command::new("add")
                .about("Add a doctor")
                .arg(emergency.clone())
                .args(record_fields.clone()),
        )
        .subcommand(
            Command::new("update")
                .about("Replace a doctor's details")
                .arg(emergency.clone())
                .arg(id.clone())
                .args(record_fields),
        )
        .subcommand(
            Command::new("delete")
                .about("Delete a doctor")
                .arg(emergency)
                .arg(id)
                .arg(Arg::new("yes").long("yes").short('y').help("Skip the confirmation prompt")),
        )
        .subcommand(
            Command::new("export")
                .about("Write the emergency doctor list as a PDF")
                .arg(Arg::new("out").long("out").short('o').takes_value(true).help("Output directory")),
        )
}

async fn run(matches: &ArgMatches) -> Result<()> {
    let config = DirectoryConfig::from_env()?;
    let directory = DoctorDirectory::new(config, ClientOptions::default())?;
    let mut router = directory.router();

    match matches.subcommand() {
        Some(("login", args)) => {
            let auth = directory.auth();
            let outcome = auth.login(value(args, "email"), value(args, "password")).await?;
            let who = outcome.session.username().unwrap_or("you").to_string();
            router.navigate(outcome.next_route)?;
            println!("Welcome, {}! Now at {}", who, router.current());
        }
        Some(("register", args)) => {
            let password = value(args, "password");
            let strength = Auth::password_strength(password);
            if strength < PasswordStrength::Fair {
                println!("Password strength: {}", strength.label());
            }
            let auth = directory.auth();
            let outcome = auth.register(value(args, "username"), value(args, "email"), password).await?;
            router.navigate(outcome.next_route)?;
            println!("Account created. Continue at {}", router.current());
        }
        Some(("logout", _)) => {
            let next = directory.auth().logout()?;
            println!("Logged out. Continue at {}", next);
        }
        Some(("whoami", _)) => match directory.sessions().load()? {
            Some(session) => println!(
                "{} <{}>",
                session.username().unwrap_or("unknown"),
                session.email().unwrap_or("no email")
            ),
            None => println!("Not logged in."),
        },
        Some(("list", args)) => {
            let mut list = open_list(&directory, &mut router, args)?;
            list.list().await?;
            let term = args.value_of("search").unwrap_or_default();
            let shown = list.filter(term);
            if shown.is_empty() {
                println!("No doctors have been added yet.");
            }
            for doctor in shown {
                print_record(doctor);
            }
        }
        Some(("add", args)) => {
            let mut list = open_list(&directory, &mut router, args)?;
            list.create(&draft_from(args, None)).await?;
            print_banner(&list);
        }
        Some(("update", args)) => {
            let mut list = open_list(&directory, &mut router, args)?;
            list.list().await?;
            let id = value(args, "id");
            let existing = list
                .records()
                .iter()
                .find(|r| r.id.as_deref() == Some(id))
                .cloned()
                .ok_or_else(|| Error::UnknownRecord(id.to_string()))?;
            list.update(id, &draft_from(args, Some(&existing))).await?;
            print_banner(&list);
        }
        Some(("delete", args)) => {
            let mut list = open_list(&directory, &mut router, args)?;
            let confirmation = if args.is_present("yes") || confirm("Are you sure you want to delete this doctor?")? {
                Confirmation::Confirmed
            } else {
                Confirmation::Declined
            };
            if list.delete(value(args, "id"), confirmation).await? {
                print_banner(&list);
            }
        }
        Some(("export", args)) => {
            if router.navigate(Route::EmergencyDoctors)? == Route::Login {
                return Err(Error::AuthMissing);
            }
            let mut list = directory.emergency_doctors();
            let exporter = directory.exporter();
            exporter.load(&PrintPdfLoader).await;
            exporter.ensure_ready()?;
            list.list().await?;
            let out = args.value_of("out").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));
            match exporter.export(list.records(), &out)? {
                Some(path) => println!("Saved {}", path.display()),
                None => println!("No emergency doctors to export."),
            }
        }
        _ => unreachable!("clap enforces a subcommand"),
    }
    Ok(())
}

fn value<'a>(args: &'a ArgMatches, name: &str) -> &'a str {
    args.value_of(name).unwrap_or_default()
}

fn open_list(directory: &DoctorDirectory, router: &mut Router, args: &ArgMatches) -> Result<DoctorList> {
    let (route, resource) = if args.is_present("emergency") {
        (Route::EmergencyDoctors, Resource::EmergencyDoctors)
    } else {
        (Route::Home, Resource::Doctors)
    };
    if router.navigate(route)? == Route::Login {
        return Err(Error::AuthMissing);
    }
    Ok(directory.list(resource))
}

fn draft_from(args: &ArgMatches, existing: Option<&DoctorRecord>) -> DoctorDraft {
    let base = existing.map(DoctorDraft::from_record).unwrap_or_default();
    DoctorDraft {
        name: args.value_of("name").map(str::to_string).unwrap_or(base.name),
        mobile_number: args.value_of("mobile").map(str::to_string).unwrap_or(base.mobile_number),
        workplace: args.value_of("workplace").map(str::to_string).unwrap_or(base.workplace),
        consultant: args.value_of("consultant").map(str::to_string).unwrap_or(base.consultant),
    }
}

fn print_record(doctor: &DoctorRecord) {
    println!(
        "{}  {}  {}  {}  [{}]",
        doctor.name,
        doctor.mobile_number,
        doctor.workplace.as_deref().unwrap_or("-"),
        doctor.consultant.as_deref().unwrap_or("-"),
        doctor.id.as_deref().unwrap_or("?"),
    );
}

fn print_banner(list: &DoctorList) {
    if let Some(banner) = list.banner() {
        println!("{}", banner.message);
    }
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}
