use std::collections::HashMap;

use anyhow::anyhow;
use shuttle_runtime::SecretStore;
use shuttle_serenity::ShuttleSerenity;

const SECRET_KEYS: [&str; 4] = [
	"DISCORD_TOKEN",
	"DISCORD_GUILD",
	"API_ADDRESS",
	"API_TOKEN",
];

#[shuttle_runtime::main]
async fn serenity(
	#[shuttle_runtime::Secrets] secret_store: SecretStore,
	#[shuttle_shared_db::Postgres] pool: sqlx::PgPool,
) -> ShuttleSerenity {
	sqlx::migrate!()
		.run(&pool)
		.await
		.map_err(|e| anyhow!("Failed to run migrations: {e}"))?;

	let secrets = SECRET_KEYS
		.into_iter()
		.filter_map(|key| Some((key.to_owned(), secret_store.get(key)?)))
		.collect::<HashMap<_, _>>();

	let client = warden::serenity(warden::SecretStore(secrets), pool).await?;

	Ok(client.0.into())
}
