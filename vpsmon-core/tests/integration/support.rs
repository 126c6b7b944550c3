//! Scripted in-memory transport and canned remote output

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use vpsmon_core::{
    CommandResult, ConnectionError, ConnectionManager, ExecError, HostConfig, MetricsCollector,
    MonitoringSettings, RemoteChannel, RemoteTransport,
};

pub const TOP: &str =
    "%Cpu(s):  8.4 us,  3.1 sy,  0.0 ni, 87.3 id,  1.0 wa,  0.0 hi,  0.2 si,  0.0 st\n";

pub const MPSTAT: &str = "\
Linux 6.1.0-25-amd64 (vps-fra-01) \t10/15/2026 \t_x86_64_\t(4 CPU)

14:02:11     CPU    %usr   %nice    %sys %iowait    %irq   %soft  %steal  %guest  %gnice   %idle
14:02:12     all    8.50    0.00    3.25    1.00    0.00    0.25    0.00    0.00    0.00   87.00
14:02:12       0   12.00    0.00    4.00    2.00    0.00    0.00    0.00    0.00    0.00   82.00
14:02:12       1    9.00    0.00    3.00    1.00    0.00    1.00    0.00    0.00    0.00   86.00
14:02:12       2    7.00    0.00    3.00    0.00    0.00    0.00    0.00    0.00    0.00   90.00
14:02:12       3    6.00    0.00    3.00    1.00    0.00    0.00    0.00    0.00    0.00   90.00

Average:     CPU    %usr   %nice    %sys %iowait    %irq   %soft  %steal  %guest  %gnice   %idle
Average:     all    8.50    0.00    3.25    1.00    0.00    0.25    0.00    0.00    0.00   87.00
Average:       0   12.00    0.00    4.00    2.00    0.00    0.00    0.00    0.00    0.00   82.00
Average:       1    9.00    0.00    3.00    1.00    0.00    1.00    0.00    0.00    0.00   86.00
Average:       2    7.00    0.00    3.00    0.00    0.00    0.00    0.00    0.00    0.00   90.00
Average:       3    6.00    0.00    3.00    1.00    0.00    0.00    0.00    0.00    0.00   90.00
";

pub const FREE: &str = "\
               total        used        free      shared  buff/cache   available
Mem:            7951        3120        1024         212        3807        4512
Swap:           2047           0        2047
";

pub const DF: &str = "\
Filesystem      Size  Used Avail Use% Mounted on
/dev/sda1        80G   34G   43G  45% /
";

pub const PS: &str = "\
USER         PID %CPU %MEM    VSZ   RSS TTY      STAT START   TIME COMMAND
mysql        812 18.4 12.1 2437616 985232 ?      Ssl  Oct14  95:12 /usr/sbin/mysqld
www-data    2231  9.7  2.3 412344 187220 ?       S    08:01   3:44 php-fpm: pool www
www-data    2232  8.9  2.2 412344 180004 ?       S    08:01   3:29 php-fpm: pool www
root         641  3.1  0.9 1801256 73412 ?       Ssl  Oct14  20:01 /usr/bin/dockerd -H fd://
node        3310  2.6  4.8 1190436 390112 ?      Sl   09:15   1:02 node /srv/app/server.js
root         455  1.2  0.4 1356784 35100 ?       Ssl  Oct14   8:12 /usr/bin/containerd
redis        701  0.8  0.3  74356 26044 ?        Ssl  Oct14   5:40 /usr/bin/redis-server 127.0.0.1:6379
root           1  0.3  0.1 167812 11840 ?        Ss   Oct14   0:05 /sbin/init
root         390  0.2  0.2  47740 16604 ?        Ss   Oct14   0:44 /lib/systemd/systemd-journald
ops        40213  0.1  0.0  10072  3304 pts/0    R+   14:02   0:00 ps aux --sort=-%cpu
";

pub const LSCPU: &str = "\
Architecture:                       x86_64
CPU op-mode(s):                     32-bit, 64-bit
Byte Order:                         Little Endian
CPU(s):                             4
On-line CPU(s) list:                0-3
Vendor ID:                          GenuineIntel
Model name:                         Intel(R) Xeon(R) Gold 6230R CPU @ 2.10GHz
CPU family:                         6
CPU MHz:                            2095.078
";

pub const OS_RELEASE: &str = "\
PRETTY_NAME=\"Debian GNU/Linux 12 (bookworm)\"
NAME=\"Debian GNU/Linux\"
VERSION_ID=\"12\"
VERSION=\"12 (bookworm)\"
ID=debian
";

/// Canned stdout for every command of a default cycle
pub fn default_outputs() -> HashMap<String, String> {
    [
        ("top -bn1 | grep 'Cpu(s)'", TOP),
        ("mpstat -P ALL 1 1", MPSTAT),
        ("free -m", FREE),
        ("df -h /", DF),
        ("ps aux --sort=-%cpu | head -11", PS),
        ("lscpu", LSCPU),
        ("cat /etc/os-release", OS_RELEASE),
        ("echo \"Connection test successful\"", "Connection test successful\n"),
    ]
    .into_iter()
    .map(|(command, output)| (command.to_string(), output.to_string()))
    .collect()
}

/// Shared script and counters behind [`ScriptedTransport`]
#[derive(Default)]
pub struct Script {
    pub outputs: Mutex<HashMap<String, String>>,
    /// Commands answered with `ExecError::SessionLost` once, then removed
    pub drop_session_on: Mutex<HashSet<String>>,
    /// Commands refused with `ExecError::Channel`
    pub refuse: Mutex<HashSet<String>>,
    pub command_delays: Mutex<HashMap<String, Duration>>,
    pub connect_delay: Mutex<Duration>,
    pub refuse_connect: AtomicBool,
    pub connects: AtomicU32,
    pub execs: AtomicU32,
    pub closes: AtomicU32,
}

impl Script {
    pub fn set_output(&self, command: &str, output: &str) {
        self.outputs
            .lock()
            .unwrap()
            .insert(command.to_string(), output.to_string());
    }

    pub fn remove_output(&self, command: &str) {
        self.outputs.lock().unwrap().remove(command);
    }

    pub fn drop_session_on(&self, command: &str) {
        self.drop_session_on
            .lock()
            .unwrap()
            .insert(command.to_string());
    }

    pub fn refuse(&self, command: &str) {
        self.refuse.lock().unwrap().insert(command.to_string());
    }

    pub fn delay(&self, command: &str, delay: Duration) {
        self.command_delays
            .lock()
            .unwrap()
            .insert(command.to_string(), delay);
    }

    pub fn set_connect_delay(&self, delay: Duration) {
        *self.connect_delay.lock().unwrap() = delay;
    }

    pub fn connects(&self) -> u32 {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn execs(&self) -> u32 {
        self.execs.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> u32 {
        self.closes.load(Ordering::SeqCst)
    }
}

pub struct ScriptedTransport {
    pub script: Arc<Script>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        let script = Script::default();
        *script.outputs.lock().unwrap() = default_outputs();
        Self {
            script: Arc::new(script),
        }
    }
}

#[async_trait]
impl RemoteTransport for ScriptedTransport {
    async fn connect(&self, config: &HostConfig) -> Result<Arc<dyn RemoteChannel>, ConnectionError> {
        self.script.connects.fetch_add(1, Ordering::SeqCst);
        let delay = *self.script.connect_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.script.refuse_connect.load(Ordering::SeqCst) {
            return Err(ConnectionError::Unreachable {
                host: config.address.clone(),
                reason: "Connection refused".into(),
            });
        }
        Ok(Arc::new(ScriptedChannel {
            script: Arc::clone(&self.script),
        }))
    }
}

pub struct ScriptedChannel {
    script: Arc<Script>,
}

#[async_trait]
impl RemoteChannel for ScriptedChannel {
    async fn exec(&self, command: &str) -> Result<CommandResult, ExecError> {
        self.script.execs.fetch_add(1, Ordering::SeqCst);

        let delay = self.script.command_delays.lock().unwrap().get(command).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.script.drop_session_on.lock().unwrap().remove(command) {
            return Err(ExecError::SessionLost("Connection reset by peer".into()));
        }
        if self.script.refuse.lock().unwrap().contains(command) {
            return Err(ExecError::Channel("administratively prohibited".into()));
        }

        let output = self.script.outputs.lock().unwrap().get(command).cloned();
        Ok(output.map_or_else(
            || CommandResult::failure(127, format!("bash: {command}: command not found")),
            CommandResult::success,
        ))
    }

    async fn close(&self) {
        self.script.closes.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn host() -> HostConfig {
    HostConfig::new("198.51.100.20", "ops").with_password("hunter2")
}

/// Manager, collector and script wired together
pub struct Harness {
    pub script: Arc<Script>,
    pub manager: Arc<ConnectionManager>,
    pub collector: Arc<MetricsCollector>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_host(host())
    }

    pub fn with_host(config: HostConfig) -> Self {
        let transport = ScriptedTransport::new();
        let script = Arc::clone(&transport.script);
        let manager = Arc::new(ConnectionManager::new(config, Arc::new(transport)));
        let collector = Arc::new(MetricsCollector::new(
            Arc::clone(&manager),
            MonitoringSettings::default(),
        ));
        Self {
            script,
            manager,
            collector,
        }
    }
}
