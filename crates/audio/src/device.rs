//! Audio-Geraete-Enumeration und -Auswahl
//!
//! Stellt Funktionen bereit um Audio-Geraete aufzulisten und das
//! gewuenschte Ein-/Ausgabegeraet auszuwaehlen (Standardgeraet oder
//! Auswahl per Namens-Teilstring aus der Konfiguration).

use cpal::traits::{DeviceTrait, HostTrait};
use cpal::Device;
use tracing::{debug, warn};

use crate::error::{AudioError, AudioResult};

/// Repraesentiert ein Audio-Geraet mit seinen Eigenschaften
#[derive(Debug, Clone)]
pub struct AudioDevice {
    /// Anzeigename des Geraets
    pub name: String,
    /// Maximale Kanalanzahl
    pub channels: u16,
}

/// Listet alle verfuegbaren Eingabegeraete auf
pub fn list_input_devices() -> AudioResult<Vec<AudioDevice>> {
    let host = cpal::default_host();
    let devices = host
        .input_devices()
        .map_err(|e| AudioError::StreamFehler(e.to_string()))?;

    let mut result = Vec::new();
    for device in devices {
        match beschreibe_eingabe(&device) {
            Ok(ad) => result.push(ad),
            Err(e) => warn!("Eingabegeraet konnte nicht gelesen werden: {}", e),
        }
    }
    debug!("Gefundene Eingabegeraete: {}", result.len());
    Ok(result)
}

/// Listet alle verfuegbaren Ausgabegeraete auf
pub fn list_output_devices() -> AudioResult<Vec<AudioDevice>> {
    let host = cpal::default_host();
    let devices = host
        .output_devices()
        .map_err(|e| AudioError::StreamFehler(e.to_string()))?;

    let mut result = Vec::new();
    for device in devices {
        match beschreibe_ausgabe(&device) {
            Ok(ad) => result.push(ad),
            Err(e) => warn!("Ausgabegeraet konnte nicht gelesen werden: {}", e),
        }
    }
    debug!("Gefundene Ausgabegeraete: {}", result.len());
    Ok(result)
}

/// Waehlt das Eingabegeraet: Standardgeraet oder per Namens-Teilstring
pub fn eingabegeraet(name: Option<&str>) -> AudioResult<Device> {
    let host = cpal::default_host();
    match name {
        None => host
            .default_input_device()
            .ok_or(AudioError::KeinStandardEingabegeraet),
        Some(n) => {
            let devices = host
                .input_devices()
                .map_err(|e| AudioError::StreamFehler(e.to_string()))?;
            suche_nach_name(devices, n)
        }
    }
}

/// Waehlt das Ausgabegeraet: Standardgeraet oder per Namens-Teilstring
pub fn ausgabegeraet(name: Option<&str>) -> AudioResult<Device> {
    let host = cpal::default_host();
    match name {
        None => host
            .default_output_device()
            .ok_or(AudioError::KeinStandardAusgabegeraet),
        Some(n) => {
            let devices = host
                .output_devices()
                .map_err(|e| AudioError::StreamFehler(e.to_string()))?;
            suche_nach_name(devices, n)
        }
    }
}

fn suche_nach_name(
    devices: impl Iterator<Item = Device>,
    name: &str,
) -> AudioResult<Device> {
    for device in devices {
        if let Ok(dev_name) = device.name() {
            if dev_name.contains(name) {
                return Ok(device);
            }
        }
    }
    Err(AudioError::GeraetNichtGefunden(name.to_string()))
}

fn beschreibe_eingabe(device: &Device) -> AudioResult<AudioDevice> {
    let name = device
        .name()
        .map_err(|e| AudioError::StreamFehler(e.to_string()))?;
    let channels = device
        .supported_input_configs()
        .map_err(|e| AudioError::StreamFehler(e.to_string()))?
        .map(|c| c.channels())
        .max()
        .unwrap_or(0);
    Ok(AudioDevice { name, channels })
}

fn beschreibe_ausgabe(device: &Device) -> AudioResult<AudioDevice> {
    let name = device
        .name()
        .map_err(|e| AudioError::StreamFehler(e.to_string()))?;
    let channels = device
        .supported_output_configs()
        .map_err(|e| AudioError::StreamFehler(e.to_string()))?
        .map(|c| c.channels())
        .max()
        .unwrap_or(0);
    Ok(AudioDevice { name, channels })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[ignore = "Benoetigt Audio-Hardware"]
    fn eingabegeraete_auflisten() {
        let result = list_input_devices();
        assert!(result.is_ok());
    }

    #[test]
    #[ignore = "Benoetigt Audio-Hardware"]
    fn standard_eingabegeraet_waehlen() {
        // Auf Systemen ohne Mikrofon schlaegt dies kontrolliert fehl
        let _ = eingabegeraet(None);
    }

    #[test]
    #[ignore = "Benoetigt Audio-Hardware"]
    fn unbekannter_geraete_name_fehler() {
        let result = eingabegeraet(Some("geraet-das-es-nicht-gibt"));
        assert!(matches!(result, Err(AudioError::GeraetNichtGefunden(_))));
    }
}
