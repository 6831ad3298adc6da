//! # Seed
//!
//! Fills an empty forum database with demo content.
//!
//! ```text
//! seed [--db PATH]
//!
//!   admin     ADMIN   creates sections
//!   moderator MOD
//!   member    -       writes topics and posts
//! ```
//!
//! Does nothing when the database already has users. Passwords are the
//! nickname followed by "-password".

use std::path::PathBuf;

use forum_core::{
    ErrorKind, Pagination, PostAdd, SectionAdd, Session, TopicAdd, UserAdd, UserEdit,
    UserFilters, UserLevel,
};
use forum_service::{Forum, ForumConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let mut config = ForumConfig::load(None)?;
    if let Some(path) = db_arg(std::env::args().skip(1))? {
        config.database_path = path;
    }
    info!(database = %config.database_path.display(), "Seeding forum");

    let forum = Forum::open(config).await?;
    let anonymous = Session::new();

    match forum
        .users()
        .all(&anonymous, UserFilters::default(), Some(Pagination::new(1, 1)), None)
        .await
    {
        Ok(_) => {
            println!("Database already has users, nothing to do");
            return Ok(());
        }
        Err(err) if err.is(ErrorKind::NotFound) => {}
        Err(err) => return Err(err.into()),
    }

    forum.bootstrap_admin(&anonymous, account("admin")).await?;
    let admin = login(&forum, "admin").await?;

    let moderator = forum.users().add(&anonymous, account("moderator")).await?;
    forum
        .users()
        .edit(
            &admin,
            UserEdit {
                level: Some(UserLevel::Mod),
                ..UserEdit::new(moderator.id)
            },
        )
        .await?;
    forum.users().add(&anonymous, account("member")).await?;
    let member = login(&forum, "member").await?;

    let mut topics = 0;
    let mut posts = 0;
    for (name, description, topic_names) in [
        ("Announcements", "News from the team", &["Welcome aboard"][..]),
        ("General", "Anything goes", &["Introduce yourself", "Favourite books"][..]),
    ] {
        let section = forum
            .sections()
            .add(
                &admin,
                SectionAdd {
                    name: name.to_string(),
                    description: Some(description.to_string()),
                },
            )
            .await?;

        for topic_name in topic_names {
            let topic = forum
                .topics()
                .add(
                    &member,
                    TopicAdd {
                        section_id: section.id,
                        user_id: member.user_id,
                        name: topic_name.to_string(),
                    },
                )
                .await?;
            topics += 1;

            for text in ["First!", "Glad to be here."] {
                forum
                    .posts()
                    .add(
                        &member,
                        PostAdd {
                            topic_id: topic.id,
                            user_id: member.user_id,
                            text: text.to_string(),
                        },
                    )
                    .await?;
                posts += 1;
            }
        }
    }

    println!("Seeded 3 users, 2 sections, {} topics, {} posts", topics, posts);
    println!("Log in as admin, moderator or member with <nickname>-password");

    forum.close().await;
    Ok(())
}

fn account(nickname: &str) -> UserAdd {
    UserAdd {
        nickname: nickname.to_string(),
        password: format!("{}-password", nickname),
        ..Default::default()
    }
}

async fn login(forum: &Forum, nickname: &str) -> Result<Session, forum_core::ForumError> {
    forum
        .users()
        .authenticate(&Session::new(), nickname, &format!("{}-password", nickname))
        .await
}

/// Reads `--db PATH` from the arguments.
fn db_arg(mut args: impl Iterator<Item = String>) -> Result<Option<PathBuf>, String> {
    match args.next().as_deref() {
        None => Ok(None),
        Some("--db") => args
            .next()
            .map(|path| Some(PathBuf::from(path)))
            .ok_or_else(|| "--db needs a path".to_string()),
        Some(other) => Err(format!("unknown argument: {}", other)),
    }
}

/// `RUST_LOG` wins; otherwise debug for the forum crates and warn for sqlx.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,forum=debug,sqlx=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
