/// Classic two-group hex dump used by the viewer output.
pub struct HexDump {
    pub row_len: usize,
    pub group_len: usize,
    pub with_addr: bool,
}

impl Default for HexDump {
    fn default() -> HexDump {
        HexDump::new()
    }
}

impl HexDump {
    pub fn new() -> HexDump {
        HexDump {
            row_len: 16,
            group_len: 8,
            with_addr: true,
        }
    }

    /// Single-row form for short values: one 8-byte group, no address.
    pub fn short() -> HexDump {
        HexDump {
            row_len: 8,
            group_len: 8,
            with_addr: false,
        }
    }

    fn hex(group: &[u8]) -> String {
        group
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn text(group: &[u8]) -> String {
        // 32 to 126 are the printable ASCII characters.
        group
            .iter()
            .map(|&b| if (32..=126).contains(&b) { b as char } else { '.' })
            .collect()
    }

    pub fn lines(&self, data: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        for (row_idx, row) in data.chunks(self.row_len).enumerate() {
            let mut hex_cols = Vec::new();
            let mut text_cols = String::new();
            for start in (0..self.row_len).step_by(self.group_len) {
                let end = (start + self.group_len).min(row.len());
                let group = if start < row.len() { &row[start..end] } else { &[][..] };
                hex_cols.push(format!("{:23}", Self::hex(group)));
                text_cols.push_str(&Self::text(group));
            }
            let body = format!("{}  |{}|", hex_cols.join("  "), text_cols);
            if self.with_addr {
                lines.push(format!("{:04x}  {}", row_idx * self.row_len, body));
            } else {
                lines.push(body);
            }
        }
        lines
    }

    pub fn dump(&self, data: &[u8]) -> String {
        self.lines(data).join("\n")
    }
}
