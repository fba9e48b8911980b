//! Seed the database with a demo artist and a few artworks.
//!
//! Safe to run twice: an existing demo account is reused, and artworks are
//! only added when the artist has none yet.

use rust_decimal::Decimal;
use tracing::info;

use brana_core::api::CreateArtworkRequest;
use brana_server::models::CurrentUser;
use brana_server::services::AuthError;

use super::{CliError, connect};

const DEMO_EMAIL: &str = "artist@brana.example";
const DEMO_USERNAME: &str = "selam_art";

/// (title, description, image, price in ETB; `None` is not for sale)
const DEMO_ARTWORKS: &[(&str, &str, &str, Option<i64>)] = &[
    (
        "Meskel Celebration",
        "Bonfire and crowds at the Finding of the True Cross, acrylic on canvas.",
        "/images/demo/meskel.jpg",
        Some(4500),
    ),
    (
        "Lalibela at Dawn",
        "The rock-hewn church of Bete Giyorgis in early light.",
        "/images/demo/lalibela.jpg",
        Some(7200),
    ),
    (
        "Coffee Ceremony",
        "Jebena, incense and three rounds of buna, oil on goatskin.",
        "/images/demo/buna.jpg",
        Some(2800),
    ),
    (
        "Saint George and the Dragon",
        "Traditional Orthodox icon style, natural pigments.",
        "/images/demo/giyorgis.jpg",
        None,
    ),
];

/// Create the demo artist and their artworks.
///
/// # Errors
///
/// Returns an error if configuration is missing or a database call fails.
pub async fn demo(password: &str) -> Result<(), CliError> {
    let state = connect().await?;
    let auth = state.auth();

    let artist = match auth
        .register(DEMO_EMAIL, password, Some(DEMO_USERNAME), Some("Selam Tesfaye"))
        .await
    {
        Ok(user) => {
            info!(user_id = %user.id, "Demo artist created");
            user
        }
        Err(AuthError::UserAlreadyExists | AuthError::UsernameTaken) => {
            let (_, user) = auth.login(DEMO_EMAIL, password).await?;
            info!(user_id = %user.id, "Reusing demo artist");
            user
        }
        Err(e) => return Err(e.into()),
    };

    let catalog = state.catalog();
    if !catalog.list_by_artist(artist.id).await?.is_empty() {
        info!("Demo artist already has artworks, nothing to do");
        return Ok(());
    }

    let actor = CurrentUser::from(&artist);
    for (title, description, image, price) in DEMO_ARTWORKS {
        let artwork = catalog
            .create(
                &actor,
                &CreateArtworkRequest {
                    title: (*title).to_owned(),
                    description: (*description).to_owned(),
                    image_ref: (*image).to_owned(),
                    price: price.map(Decimal::from),
                },
            )
            .await?;
        info!(artwork_id = %artwork.id, title = %artwork.title, "Artwork created");
    }

    info!("Seeding complete!");
    info!("  Artist: {}", DEMO_EMAIL);
    info!("  Artworks: {}", DEMO_ARTWORKS.len());
    Ok(())
}
