use colored::Colorize;
use repo_sync::{FilePresence, RepoMetadata, Visibility};

pub fn header(title: &str) {
    println!("{}", title.bold().underline());
}

pub fn hint(msg: &str) {
    println!("{} {}", "hint:".cyan().bold(), msg.dimmed());
}

pub fn info(msg: &str) {
    eprintln!("{} {}", "info:".blue().bold(), msg);
}

pub fn warn(msg: &str) {
    eprintln!("{} {}", "warning:".yellow().bold(), msg);
}

pub fn success(msg: &str) {
    println!("{} {}", "✓".green().bold(), msg);
}

fn presence_label(presence: FilePresence) -> String {
    match presence {
        FilePresence::Private => presence.as_str().dimmed().to_string(),
        FilePresence::Common => presence.as_str().green().to_string(),
        _ => presence.as_str().cyan().to_string()
    }
}

pub fn repo_line(repo: &RepoMetadata) -> String {
    let visibility = match repo.visibility {
        Visibility::Public => "public".normal(),
        Visibility::Private => "private".yellow()
    };
    let mut line = format!(
        "{:<32} {:<8} {:<10}",
        repo.name.bold(),
        visibility,
        presence_label(repo.file_presence)
    );
    if !repo.category.is_empty() {
        line.push_str(&format!(" [{}]", repo.category));
    }
    if !repo.tags.is_empty() {
        line.push_str(&format!(" {}", repo.tags.join(", ").dimmed()));
    }
    line
}

pub fn repo_table(repos: &[RepoMetadata]) {
    if repos.is_empty() {
        println!("  {}", "(no repositories)".dimmed());
        return;
    }
    for repo in repos {
        println!("  {}", repo_line(repo));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use testing::metadata;

    #[test]
    fn test_repo_line_includes_category_and_tags() {
        colored::control::set_override(false);
        let repo = metadata("site", FilePresence::Common, "web", &["hugo", "blog"]);

        let line = repo_line(&repo);
        assert!(line.starts_with("site"));
        assert!(line.contains("common"));
        assert!(line.contains("[web]"));
        assert!(line.contains("hugo, blog"));
    }

    #[test]
    fn test_repo_line_without_tags() {
        colored::control::set_override(false);
        let repo = metadata("notes", FilePresence::Private, "", &[]);

        let line = repo_line(&repo);
        assert!(!line.contains('['));
        assert!(line.contains("private"));
    }

    #[test]
    fn test_repo_table_empty_does_not_panic() {
        repo_table(&[]);
    }
}
