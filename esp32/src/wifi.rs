use anyhow::anyhow;
use embedded_svc::wifi::{AuthMethod, ClientConfiguration, Configuration};
use esp_idf_svc::wifi::{BlockingWifi, EspWifi};
use log::info;

const SSID: &str = env!("WIFI_SSID");
const PASSWORD: &str = env!("WIFI_PASS");

pub type Wifi = BlockingWifi<EspWifi<'static>>;

/// Join the configured network and wait for an address.
pub fn connect(wifi: &mut Wifi) -> anyhow::Result<()> {
    let wifi_configuration: Configuration = Configuration::Client(ClientConfiguration {
        ssid: SSID
            .try_into()
            .map_err(|_| anyhow!("SSID `{SSID}` is too long"))?,
        bssid: None,
        auth_method: AuthMethod::WPA2Personal,
        password: PASSWORD
            .try_into()
            .map_err(|_| anyhow!("Wifi password is too long"))?,
        channel: None,
        ..Default::default()
    });

    wifi.set_configuration(&wifi_configuration)?;

    wifi.start()?;
    info!("Wifi started");

    info!("Connecting to {SSID}...");
    wifi.connect()?;
    info!("Wifi connected");

    wifi.wait_netif_up()?;
    info!("Wifi netif up");

    let ip_info = wifi.wifi().sta_netif().get_ip_info()?;
    info!("My IP address is {}", ip_info.ip);

    Ok(())
}
