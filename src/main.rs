use std::path::PathBuf;

use clap::Parser;
use saml2_registration::{
    config::Saml2Config,
    core::Saml2X509Credential,
    observability,
    registration::{PlaceholderResolver, RelyingPartyRegistration, generate_sp_metadata},
};
use serde::Serialize;

/// CLI arguments for the SAML registration tool
#[derive(Parser, Debug)]
#[command(version, about = "SAML 2.0 relying-party registration tool", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Path to config file
    #[arg(short, long, global = true, default_value = "saml2.toml")]
    config: PathBuf,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Load every registration and print a JSON summary
    Inspect,
    /// Print relying-party metadata XML for one registration
    Metadata {
        #[arg(short, long)]
        registration_id: String,
        /// Base URL used to resolve `{baseUrl}` style placeholders
        #[arg(short, long)]
        base_url: Option<String>,
    },
    /// Resolve placeholders against a base URL and print a JSON summary
    Resolve {
        #[arg(short, long)]
        base_url: String,
    },
}

#[derive(Debug, Serialize)]
struct RegistrationSummary {
    registration_id: String,
    entity_id: String,
    assertion_consumer_service_location: String,
    assertion_consumer_service_binding: String,
    single_logout_service_location: Option<String>,
    single_logout_service_response_location: Option<String>,
    single_logout_service_bindings: Vec<String>,
    name_id_format: Option<String>,
    authn_requests_signed: bool,
    signing_certificates: Vec<String>,
    decryption_certificates: Vec<String>,
    asserting_party: AssertingPartySummary,
}

#[derive(Debug, Serialize)]
struct AssertingPartySummary {
    entity_id: String,
    from_metadata: bool,
    want_authn_requests_signed: bool,
    signing_algorithms: Vec<String>,
    verification_certificates: Vec<String>,
    encryption_certificates: Vec<String>,
    single_sign_on_service_location: String,
    single_sign_on_service_binding: String,
    single_logout_service_location: Option<String>,
    single_logout_service_response_location: Option<String>,
    single_logout_service_binding: String,
}

fn subjects(credentials: &[Saml2X509Credential]) -> Vec<String> {
    credentials
        .iter()
        .map(|c| {
            c.certificate()
                .subject_name()
                .entries()
                .filter_map(|e| e.data().as_utf8().ok().map(|s| s.to_string()))
                .collect::<Vec<_>>()
                .join(",")
        })
        .collect()
}

impl From<&RelyingPartyRegistration> for RegistrationSummary {
    fn from(r: &RelyingPartyRegistration) -> Self {
        let ap = r.asserting_party_details();
        Self {
            registration_id: r.registration_id().to_string(),
            entity_id: r.entity_id().to_string(),
            assertion_consumer_service_location: r
                .assertion_consumer_service_location()
                .to_string(),
            assertion_consumer_service_binding: r.assertion_consumer_service_binding().to_string(),
            single_logout_service_location: r.single_logout_service_location().map(String::from),
            single_logout_service_response_location: r
                .single_logout_service_response_location()
                .map(String::from),
            single_logout_service_bindings: r
                .single_logout_service_bindings()
                .iter()
                .map(ToString::to_string)
                .collect(),
            name_id_format: r.name_id_format().map(String::from),
            authn_requests_signed: r.is_authn_requests_signed(),
            signing_certificates: subjects(r.signing_x509_credentials()),
            decryption_certificates: subjects(r.decryption_x509_credentials()),
            asserting_party: AssertingPartySummary {
                entity_id: ap.entity_id().to_string(),
                from_metadata: ap.entity_descriptor().is_some(),
                want_authn_requests_signed: ap.want_authn_requests_signed(),
                signing_algorithms: ap.signing_algorithms().to_vec(),
                verification_certificates: subjects(ap.verification_x509_credentials()),
                encryption_certificates: subjects(ap.encryption_x509_credentials()),
                single_sign_on_service_location: ap.single_sign_on_service_location().to_string(),
                single_sign_on_service_binding: ap.single_sign_on_service_binding().to_string(),
                single_logout_service_location: ap
                    .single_logout_service_location()
                    .map(String::from),
                single_logout_service_response_location: ap
                    .single_logout_service_response_location()
                    .map(String::from),
                single_logout_service_binding: ap.single_logout_service_binding().to_string(),
            },
        }
    }
}

fn main() {
    let args = Args::parse();

    let config = match Saml2Config::from_file(&args.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", args.config.display(), e);
            std::process::exit(1);
        }
    };

    if let Err(e) = observability::init_tracing(&config.logging) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to start runtime: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(run(config, args.command)) {
        tracing::error!(error = %e, "Command failed");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(config: Saml2Config, command: Command) -> Result<(), Box<dyn std::error::Error>> {
    let registrations = config.load_registrations().await?;

    match command {
        Command::Inspect => print_summaries(&registrations),
        Command::Resolve { base_url } => {
            let resolver = PlaceholderResolver::new(&base_url)?;
            let resolved = registrations
                .iter()
                .map(|r| resolver.resolve_registration(r))
                .collect::<Result<Vec<_>, _>>()?;
            print_summaries(&resolved)
        }
        Command::Metadata {
            registration_id,
            base_url,
        } => {
            let Some(registration) = registrations
                .iter()
                .find(|r| r.registration_id() == registration_id)
            else {
                return Err(format!("no registration with id '{registration_id}'").into());
            };
            let registration = match base_url {
                Some(base_url) => {
                    PlaceholderResolver::new(&base_url)?.resolve_registration(registration)?
                }
                None => {
                    tracing::warn!(
                        registration_id = %registration_id,
                        "No --base-url given; placeholders are emitted unresolved"
                    );
                    registration.clone()
                }
            };
            println!("{}", generate_sp_metadata(&registration)?);
            Ok(())
        }
    }
}

fn print_summaries(
    registrations: &[RelyingPartyRegistration],
) -> Result<(), Box<dyn std::error::Error>> {
    let summaries: Vec<RegistrationSummary> = registrations.iter().map(Into::into).collect();
    println!("{}", serde_json::to_string_pretty(&summaries)?);
    Ok(())
}
