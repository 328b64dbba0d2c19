//! Catalogue filtering and the built-in deny-list.

use std::collections::BTreeSet;

use url::Url;

use crate::torrent_client::TrackerSet;

/// Announce URLs that are never added to a torrent.
pub const DEFAULT_DENIED_TRACKERS: &[&str] = &[
    // only accept authorized info hashes
    "http://bt.beatrice-raws.org/announce",
    "http://nyaa.tracker.wf:7777/announce",
    "http://open.touki.ru/announce.php",
    "http://sukebei.tracker.wf:8888/announce",
    "http://torrent.arjlover.net:2710/announce",
    "http://torrent.resonatingmedia.com:6969/announce",
    "http://torrents.hikarinokiseki.com:6969/announce",
    "http://tracker.gcvchp.com:2710/announce",
    "http://tracker.minglong.org:8080/announce",
    "http://tracker.pussytorrents.org:3000/announce",
    "http://tracker.tasvideos.org:6969/announce",
    "http://www.tribalmixes.com/announce.php",
    "https://torrent.ubuntu.com/announce",
    "udp://anidex.moe:6969/announce",
    // cloudflare access denied
    "http://104.28.16.69/announce",
    "https://tracker.shittyurl.org/announce",
    "https://tracker.nitrix.me/announce",
    "https://tracker.lilithraws.cf/announce",
    "https://tracker.nanoha.org/announce",
    "http://www.xwt-classics.net/announce.php",
    "http://torrentsmd.com:8080/announce",
    // bot verification
    "https://tracker.parrotsec.org/announce",
    // 404
    "http://baibako.tv/announce",
];

/// The built-in deny-list as an owned set.
pub fn default_denied() -> BTreeSet<String> {
    DEFAULT_DENIED_TRACKERS
        .iter()
        .map(|url| url.to_string())
        .collect()
}

/// Turn raw catalogue lines into the set of acceptable announce URLs.
///
/// Blank lines, lines that do not parse as an absolute URL, WebSocket
/// (`ws`/`wss`) trackers and denied URLs are dropped.
pub fn filter_trackers<I, S>(lines: I, denied: &BTreeSet<String>) -> TrackerSet
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    lines
        .into_iter()
        .filter_map(|line| {
            let line = line.as_ref().trim();
            if line.is_empty() {
                return None;
            }
            let url = Url::parse(line).ok()?;
            if matches!(url.scheme(), "ws" | "wss") || denied.contains(line) {
                return None;
            }
            Some(line.to_string())
        })
        .collect()
}
