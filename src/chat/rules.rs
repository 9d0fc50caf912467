//! Ordered reply rules. The first rule whose predicate holds renders the reply.

use super::context::{AnomalySummary, Enrichment};
use super::message::Message;
use crate::model::MaintenanceWindow;

pub struct Rule {
    pub name: &'static str,
    pub applies: fn(&Message) -> bool,
    pub render: fn(&Message, &Enrichment) -> String,
}

/// Priority order matters: earlier rules shadow later ones.
pub static RULES: &[Rule] = &[
    Rule {
        name: "critical",
        applies: |m| m.triggers.critical,
        render: render_critical,
    },
    Rule {
        name: "statistics",
        applies: |m| m.triggers.statistics,
        render: render_statistics,
    },
    Rule {
        name: "maintenance",
        applies: |m| m.triggers.maintenance,
        render: render_maintenance,
    },
    Rule {
        name: "equipment",
        applies: |m| m.triggers.equipment_id.is_some() || m.triggers.equipment_keyword,
        render: render_equipment,
    },
    Rule {
        name: "search",
        applies: |m| m.triggers.search,
        render: render_search,
    },
    Rule {
        name: "help",
        applies: |m| m.triggers.help,
        render: render_help,
    },
    Rule {
        name: "default",
        applies: |_| true,
        render: render_default,
    },
];

/// Render with the first matching rule. Returns the rule name and the text.
pub fn respond(message: &Message, ctx: &Enrichment) -> (&'static str, String) {
    for rule in RULES {
        if (rule.applies)(message) {
            return (rule.name, (rule.render)(message, ctx));
        }
    }
    ("default", render_default(message, ctx))
}

fn bullet(a: &AnomalySummary) -> String {
    let what = a
        .description
        .as_deref()
        .filter(|d| !d.trim().is_empty())
        .unwrap_or("sans description");
    format!(
        "• {} : {} (criticité {}, {})",
        a.equipment_id,
        what,
        a.criticality.label(),
        a.status.label()
    )
}

fn bullets(items: &[AnomalySummary]) -> String {
    items.iter().map(bullet).collect::<Vec<_>>().join("\n")
}

fn render_critical(_m: &Message, ctx: &Enrichment) -> String {
    match &ctx.critical {
        Some(c) if c.count > 0 => match c.anomalies.first() {
            Some(first) => {
                let service = first
                    .service
                    .as_deref()
                    .map(|s| format!(" (service {s})"))
                    .unwrap_or_default();
                format!(
                    "Il y a actuellement {} anomalie(s) critique(s) ouverte(s). \
                     La plus récente concerne l'équipement {}{}.\n{}\n\
                     Je vous recommande de les traiter en priorité.",
                    c.count,
                    first.equipment_id,
                    service,
                    bullets(&c.anomalies)
                )
            }
            None => format!(
                "Il y a actuellement {} anomalie(s) critique(s) ouverte(s).",
                c.count
            ),
        },
        Some(_) => "Bonne nouvelle : aucune anomalie critique n'est ouverte actuellement.".to_string(),
        None => "Je ne peux pas consulter les anomalies critiques pour le moment. \
                 Consultez le tableau de bord pour la liste à jour."
            .to_string(),
    }
}

fn render_statistics(_m: &Message, ctx: &Enrichment) -> String {
    match &ctx.anomaly_counts {
        Some(c) => {
            let closed = c.total.saturating_sub(c.open);
            format!(
                "Le système recense {} anomalie(s), dont {} ouverte(s) et {} traitée(s) ou clôturée(s). \
                 Le tableau de bord détaille le taux de traitement et le temps moyen de résolution.",
                c.total, c.open, closed
            )
        }
        None => "Les statistiques détaillées (taux de traitement, temps moyen de résolution, \
                 répartition par service) sont disponibles sur le tableau de bord."
            .to_string(),
    }
}

fn window_line(w: &MaintenanceWindow) -> String {
    let kind = w.window_type.as_deref().unwrap_or("maintenance");
    format!(
        "• {} le {} ({} jour(s))",
        kind,
        w.start_date.format("%d/%m/%Y"),
        w.duration_days
    )
}

fn render_maintenance(_m: &Message, ctx: &Enrichment) -> String {
    match ctx.maintenance_windows.as_deref() {
        Some(all @ [first, ..]) => {
            format!(
                "Prochaine fenêtre de maintenance : {} le {}.\n{}",
                first.window_type.as_deref().unwrap_or("maintenance"),
                first.start_date.format("%d/%m/%Y"),
                all.iter().map(window_line).collect::<Vec<_>>().join("\n")
            )
        }
        Some([]) => "Aucune fenêtre de maintenance n'est planifiée prochainement. \
                     Pensez à en programmer une pour les anomalies en attente."
            .to_string(),
        None => "Je n'ai pas accès au planning de maintenance pour le moment. \
                 Consultez la page Maintenance pour les fenêtres planifiées."
            .to_string(),
    }
}

fn render_equipment(m: &Message, ctx: &Enrichment) -> String {
    let Some(id) = m.triggers.equipment_id.as_deref() else {
        return "Précisez l'identifiant de l'équipement (par exemple P-101) \
                pour que je recherche ses anomalies actives."
            .to_string();
    };
    match ctx.equipment_anomalies.as_deref() {
        Some([]) => format!("Aucune anomalie active trouvée pour l'équipement {id}."),
        Some(list) => format!(
            "L'équipement {} a {} anomalie(s) active(s) :\n{}",
            id,
            list.len(),
            bullets(list)
        ),
        None => format!(
            "Je ne peux pas vérifier l'équipement {id} pour le moment. Réessayez dans quelques instants."
        ),
    }
}

fn render_search(m: &Message, ctx: &Enrichment) -> String {
    let Some(term) = m.triggers.search_term.as_deref() else {
        return "Que souhaitez-vous rechercher ? Indiquez un mot-clé, par exemple « fuite » ou « vibration »."
            .to_string();
    };
    match ctx.search_results.as_deref() {
        Some([]) => format!("Aucune anomalie ne correspond à « {term} »."),
        Some(list) => format!(
            "J'ai trouvé {} anomalie(s) correspondant à « {} » :\n{}",
            list.len(),
            term,
            bullets(list)
        ),
        None => format!("La recherche « {term} » n'a pas pu aboutir pour le moment."),
    }
}

fn render_help(_m: &Message, _ctx: &Enrichment) -> String {
    "Je peux vous aider à :\n\
     • lister les anomalies critiques ouvertes\n\
     • donner les statistiques des anomalies\n\
     • consulter les prochaines fenêtres de maintenance\n\
     • vérifier l'état d'un équipement (ex. « état de P-101 »)\n\
     • rechercher des anomalies par mot-clé (ex. « recherche fuite »)"
        .to_string()
}

fn render_default(_m: &Message, ctx: &Enrichment) -> String {
    match ctx.recent_anomalies.as_deref() {
        Some([latest, ..]) => format!(
            "La dernière anomalie enregistrée concerne l'équipement {} ({}). \
             Posez-moi une question sur les anomalies critiques, un équipement, \
             la maintenance ou les statistiques.",
            latest.equipment_id,
            latest.status.label()
        ),
        _ => "Je suis l'assistant TAMS. Posez-moi une question sur les anomalies critiques, \
              un équipement (ex. P-101), la maintenance ou les statistiques. \
              Tapez « aide » pour la liste des possibilités."
            .to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::context::{AnomalyCounts, CriticalOverview};
    use crate::model::AnomalyStatus;
    use crate::scoring::CriticalityLevel;
    use chrono::Utc;

    fn summary(eq: &str) -> AnomalySummary {
        AnomalySummary {
            id: format!("id-{eq}"),
            equipment_id: eq.to_string(),
            status: AnomalyStatus::New,
            criticality: CriticalityLevel::Critical,
            service: Some("Production".into()),
            description: Some("Fuite d'huile".into()),
            created_at: Utc::now(),
        }
    }

    fn rule_for(text: &str) -> &'static str {
        respond(&Message::parse(text), &Enrichment::default()).0
    }

    #[test]
    fn test_priority_order() {
        assert_eq!(rule_for("statistiques des anomalies critiques"), "critical");
        assert_eq!(rule_for("combien de maintenance"), "statistics");
        assert_eq!(rule_for("maintenance de P-101"), "maintenance");
        assert_eq!(rule_for("recherche P-101"), "equipment");
        assert_eq!(rule_for("recherche fuite"), "search");
        assert_eq!(rule_for("aide"), "help");
        assert_eq!(rule_for("bonjour"), "default");
    }

    #[test]
    fn test_every_rule_has_unique_name() {
        let mut names: Vec<&str> = RULES.iter().map(|r| r.name).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), RULES.len());
        assert_eq!(RULES.last().map(|r| r.name), Some("default"));
    }

    #[test]
    fn test_critical_reply_mentions_count_and_first_equipment() {
        let ctx = Enrichment {
            critical: Some(CriticalOverview {
                count: 2,
                anomalies: vec![summary("P-204"), summary("K-7")],
            }),
            ..Enrichment::default()
        };
        let (_, text) = respond(&Message::parse("Quelles sont les anomalies critiques?"), &ctx);
        assert!(text.contains('2'));
        assert!(text.contains("P-204"));
        assert!(text.contains("K-7"));
    }

    #[test]
    fn test_templates_degrade_without_context() {
        let (_, text) = respond(&Message::parse("anomalies critiques"), &Enrichment::default());
        assert!(text.contains("tableau de bord"));

        let (_, text) = respond(&Message::parse("état de P-101"), &Enrichment::default());
        assert!(text.contains("P-101"));
        assert!(text.contains("pour le moment"));
    }

    #[test]
    fn test_equipment_without_match() {
        let ctx = Enrichment {
            equipment_anomalies: Some(Vec::new()),
            ..Enrichment::default()
        };
        let (rule, text) = respond(&Message::parse("Quel est l'état de P-101 ?"), &ctx);
        assert_eq!(rule, "equipment");
        assert_eq!(text, "Aucune anomalie active trouvée pour l'équipement P-101.");
    }

    #[test]
    fn test_statistics_reply() {
        let ctx = Enrichment {
            anomaly_counts: Some(AnomalyCounts { total: 10, open: 7 }),
            ..Enrichment::default()
        };
        let (_, text) = respond(&Message::parse("combien d'anomalies ?"), &ctx);
        assert!(text.contains("10 anomalie(s)"));
        assert!(text.contains("7 ouverte(s)"));
        assert!(text.contains("3 traitée(s)"));
    }
}
