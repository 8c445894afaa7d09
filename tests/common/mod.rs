use complaint_lens::config::Config;
use serde_json::json;
use std::path::Path;

/// 10 complaints: 6 App / 4 PIX, 7 Resolvido / 3 Não resolvido
pub fn write_corpus(path: &Path) {
    let records: Vec<_> = (0..10)
        .map(|i| {
            json!({
                "categoria": if i < 6 { "App" } else { "PIX" },
                "status": if i < 7 { "Resolvido" } else { "Não resolvido" },
                "data": format!("2025-09-{:02}", 22 + i % 5),
                "titulo": if i % 2 == 0 { "App com erro no login" } else { "Problema no PIX" },
            })
        })
        .collect();

    let document = json!({
        "metadata": {
            "fonte": "Reclame Aqui",
            "total_reclamacoes": 10,
            "data_extracao": "2025-10-01"
        },
        "reclamacoes": records
    });

    std::fs::write(path, document.to_string()).expect("write corpus");
}

/// Offline configuration rooted in `dir`: no hosted models, dry-run mail
pub fn offline_config(dir: &Path) -> Config {
    let mut config = Config::default();
    config.data.path = dir.join("reclamacoes.json");
    config.output.directory = dir.join("results");
    config.llm.enabled = false;
    config.mail.sender = "analista@example.com".to_string();
    config.mail.password = "segredo".to_string();
    config.mail.dry_run = true;
    config.mail.outbox_directory = dir.join("outbox");
    config
}
