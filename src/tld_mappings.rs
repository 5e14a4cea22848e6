use once_cell::sync::Lazy;
use std::collections::HashMap;

// Known registry whois servers for high-traffic TLDs; anything else is
// discovered through IANA at lookup time.
pub static KNOWN_TLD_SERVERS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let mut map = HashMap::new();

    // Legacy gTLDs
    map.insert("com", "whois.verisign-grs.com");
    map.insert("net", "whois.verisign-grs.com");
    map.insert("org", "whois.publicinterestregistry.org");
    map.insert("info", "whois.identity.digital");
    map.insert("biz", "whois.nic.biz");

    // New gTLDs frequently seen in abuse feeds
    map.insert("xyz", "whois.nic.xyz");
    map.insert("top", "whois.nic.top");
    map.insert("shop", "whois.nic.shop");
    map.insert("online", "whois.nic.online");
    map.insert("site", "whois.nic.site");
    map.insert("store", "whois.nic.store");
    map.insert("club", "whois.nic.club");
    map.insert("icu", "whois.nic.icu");
    map.insert("app", "whois.nic.google");
    map.insert("dev", "whois.nic.google");

    // ccTLDs
    map.insert("uk", "whois.nic.uk");
    map.insert("co.uk", "whois.nic.uk");
    map.insert("de", "whois.denic.de");
    map.insert("fr", "whois.nic.fr");
    map.insert("nl", "whois.domain-registry.nl");
    map.insert("io", "whois.nic.io");
    map.insert("co", "whois.nic.co");
    map.insert("us", "whois.nic.us");
    map.insert("ca", "whois.cira.ca");
    map.insert("au", "whois.auda.org.au");
    map.insert("com.au", "whois.auda.org.au");
    map.insert("jp", "whois.jprs.jp");
    map.insert("ru", "whois.tcinet.ru");
    map.insert("br", "whois.registro.br");
    map.insert("com.br", "whois.registro.br");

    map
});
