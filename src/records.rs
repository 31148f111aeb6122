use serde_json::{Map, Value};

/// One unit as the registry returns it: field name to value.
///
/// The registry exposes dozens of loosely typed fields per unit; the export
/// only ever looks fields up by name, so the records stay generic maps and
/// only the reply envelopes are typed.
pub type UnitRecord = Map<String, Value>;

/// Columns of the unit summary export, in export order.
pub const SUMMARY_FIELDS: &[&str] = &[
    "EinheitMastrNummer",
    "Name",
    "Einheitart",
    "Einheittyp",
    "Standort",
    "Bruttoleistung",
    "Erzeugungsleistung",
    "EinheitBetriebsstatus",
    "Anlagenbetreiber",
    "EegMastrNummer",
    "KwkMastrNummer",
    "SpeMastrNummer",
    "GenMastrNummer",
    "BestandsanlageMastrNummer",
    "NichtVorhandenInMigriertenEinheiten",
];

/// Columns of the solar unit detail export, in export order.
///
/// The leading columns are the registry's call metadata; it returns them
/// inline with the unit data, so they export like any other field.
pub const DETAIL_FIELDS: &[&str] = &[
    "Ergebniscode",
    "AufrufVeraltet",
    "AufrufLebenszeitEnde",
    "AufrufVersion",
    "EinheitMastrNummer",
    "DatumLetzteAktualisierung",
    "LokationMastrNummer",
    "NetzbetreiberpruefungStatus",
    "NetzbetreiberpruefungDatum",
    "AnlagenbetreiberMastrNummer",
    "Land",
    "Bundesland",
    "Landkreis",
    "Gemeinde",
    "Gemeindeschluessel",
    "Postleitzahl",
    "Gemarkung",
    "FlurFlurstuecknummern",
    "Strasse",
    "StrasseNichtGefunden",
    "Hausnummer",
    "HausnummerNichtGefunden",
    "Adresszusatz",
    "Ort",
    "Laengengrad",
    "Breitengrad",
    "UtmZonenwert",
    "UtmEast",
    "UtmNorth",
    "GaussKruegerHoch",
    "GaussKruegerRechts",
    "Meldedatum",
    "GeplantesInbetriebnahmedatum",
    "Inbetriebnahmedatum",
    "DatumEndgueltigeStilllegung",
    "DatumBeginnVoruebergehendeStilllegung",
    "DatumWiederaufnahmeBetrieb",
    "EinheitBetriebsstatus",
    "BestandsanlageMastrNummer",
    "NichtVorhandenInMigriertenEinheiten",
    "NameStromerzeugungseinheit",
    "Weic",
    "WeicDisplayName",
    "Kraftwerksnummer",
    "Energietraeger",
    "Bruttoleistung",
    "Nettonennleistung",
    "AnschlussAnHoechstOderHochSpannung",
    "Schwarzstartfaehigkeit",
    "Inselbetriebsfaehigkeit",
    "Einsatzverantwortlicher",
    "FernsteuerbarkeitNb",
    "FernsteuerbarkeitDv",
    "FernsteuerbarkeitDr",
    "Einspeisungsart",
    "PraequalifiziertFuerRegelenergie",
    "GenMastrNummer",
    "zugeordneteWirkleistungWechselrichter",
    "GemeinsamerWechselrichterMitSpeicher",
    "AnzahlModule",
    "Lage",
    "Leistungsbegrenzung",
    "EinheitlicheAusrichtungUndNeigungswinkel",
    "Hauptausrichtung",
    "HauptausrichtungNeigungswinkel",
    "Nebenausrichtung",
    "NebenausrichtungNeigungswinkel",
    "InAnspruchGenommeneFlaeche",
    "ArtDerFlaeche",
    "InAnspruchGenommeneAckerflaeche",
    "Nutzungsbereich",
    "EegMastrNummer",
];

/// Placeholder exported when a wrapped field carries no `Wert` member.
pub(crate) const UNKNOWN_STRUCTURE: &str = "<<unknown structure>>";

/// Reply envelope of `GetListeAlleEinheiten`.
#[derive(Debug, serde::Deserialize)]
pub(crate) struct ListReply {
    #[serde(default, rename = "Ergebniscode")]
    pub(crate) code: Option<String>,
    #[serde(default, rename = "Einheiten")]
    pub(crate) units: Vec<UnitRecord>,
}

/// Some detail fields arrive wrapped as `{"Wert": ..., ...}` objects; the
/// export wants the inner value.
pub(crate) fn flatten_field(value: &Value) -> Value {
    match value {
        Value::Object(map) => map
            .get("Wert")
            .cloned()
            .unwrap_or_else(|| Value::String(UNKNOWN_STRUCTURE.to_string())),
        other => other.clone(),
    }
}

pub(crate) fn unit_type(record: &UnitRecord) -> Option<&str> {
    record.get("Einheittyp").and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flatten_unwraps_wert() {
        let v = json!({"Wert": "In Betrieb", "NichtVorhanden": false});
        assert_eq!(flatten_field(&v), json!("In Betrieb"));
    }

    #[test]
    fn flatten_marks_unknown_structures() {
        let v = json!({"Inhalt": 3});
        assert_eq!(flatten_field(&v), json!(UNKNOWN_STRUCTURE));
    }

    #[test]
    fn flatten_passes_scalars_through() {
        assert_eq!(flatten_field(&json!("SEE123")), json!("SEE123"));
        assert_eq!(flatten_field(&json!(12.5)), json!(12.5));
        assert_eq!(flatten_field(&json!(null)), json!(null));
    }

    #[test]
    fn list_reply_deserializes() {
        let reply: ListReply = serde_json::from_str(
            r#"{"Ergebniscode":"OkWeitereDatenVorhanden","Einheiten":[{"EinheitMastrNummer":"SEE1"}]}"#,
        )
        .unwrap();
        assert_eq!(reply.code.as_deref(), Some("OkWeitereDatenVorhanden"));
        assert_eq!(reply.units.len(), 1);
    }

    #[test]
    fn summary_export_starts_with_the_registry_number() {
        assert_eq!(SUMMARY_FIELDS[0], "EinheitMastrNummer");
        assert!(DETAIL_FIELDS.contains(&"EinheitMastrNummer"));
    }
}
